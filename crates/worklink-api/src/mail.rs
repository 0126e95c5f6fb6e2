//! Email transport. Delivery is best-effort: OTP issuance succeeds once the
//! row is persisted, and send failures are logged, never surfaced.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use worklink_types::models::OtpKind;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(server: &str, user: &str, pass: &str, from: &str) -> Result<Self> {
        let creds = Credentials::new(user.to_string(), pass.to_string());
        let transport = SmtpTransport::relay(server)
            .context("invalid SMTP relay")?
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Stand-in when SMTP is unconfigured: logs the mail instead of sending it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!("Mail (not sent, SMTP unconfigured) to {}: {}", to, subject);
        Ok(())
    }
}

/// Dispatch an OTP email. Failures are swallowed here by design; callers
/// treat issuance as successful once the OTP row exists.
pub fn send_otp_email(mailer: &dyn Mailer, to: &str, code: &str, kind: OtpKind) {
    let (subject, intro) = match kind {
        OtpKind::EmailVerification => ("Email Verification - WorkLink", "Your email verification OTP"),
        OtpKind::PasswordReset => ("Password Reset - WorkLink", "Your password reset OTP"),
    };
    let body = format!("{}: {}\n\nThis code expires in 5 minutes.", intro, code);

    if let Err(e) = mailer.send(to, subject, &body) {
        warn!("Failed to send OTP email to {}: {:#}", to, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingMailer;

    impl Mailer for FailingMailer {
        fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            anyhow::bail!("transport down")
        }
    }

    struct RecordingMailer(Mutex<Vec<(String, String, String)>>);

    impl Mailer for RecordingMailer {
        fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    #[test]
    fn send_failure_is_swallowed() {
        // must not panic or propagate
        send_otp_email(&FailingMailer, "a@x.com", "123456", OtpKind::EmailVerification);
    }

    #[test]
    fn otp_mail_carries_code_and_kind() {
        let mailer = RecordingMailer(Mutex::new(vec![]));
        send_otp_email(&mailer, "a@x.com", "123456", OtpKind::PasswordReset);

        let sent = mailer.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Password Reset"));
        assert!(sent[0].2.contains("123456"));
    }
}
