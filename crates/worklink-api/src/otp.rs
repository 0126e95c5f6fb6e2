//! OTP lifecycle: none → pending → verified | expired/superseded.
//!
//! Issuing deletes any unverified code of the same kind for the user, so at
//! most one is pending per (user, kind). Expiry is computed from created_at;
//! nothing in the store marks a code expired.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use worklink_db::models::OtpRow;
use worklink_db::Database;
use worklink_types::models::OtpKind;

pub const OTP_TTL_MINUTES: i64 = 5;

/// Uniform 6-digit code, 000000–999999. Codes are not unique across users.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..=999_999u32))
}

/// True once `now` is past created_at + 5 minutes. Unparseable timestamps
/// count as expired rather than granting a stale code extra life.
pub fn is_expired(created_at: &str, now: DateTime<Utc>) -> bool {
    match created_at.parse::<DateTime<Utc>>() {
        Ok(created) => now > created + Duration::minutes(OTP_TTL_MINUTES),
        Err(_) => true,
    }
}

/// Issue a fresh code for the user, superseding any pending one of this kind.
pub fn issue(db: &Database, user_id: &str, kind: OtpKind) -> Result<OtpRow> {
    let id = Uuid::new_v4().to_string();
    let code = generate_code();
    db.replace_otp(&id, user_id, &code, kind.as_str())
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// No pending code matches user + code + kind.
    Invalid,
    /// A matching code exists but its deadline has passed.
    Expired,
}

/// Check a submitted code without consuming it. Used by the forgot-password
/// pre-check, where the same code must still work for the actual reset.
pub fn peek(
    db: &Database,
    user_id: &str,
    code: &str,
    kind: OtpKind,
    now: DateTime<Utc>,
) -> Result<Result<(), VerifyError>> {
    let Some(row) = db.find_pending_otp(user_id, code, kind.as_str())? else {
        return Ok(Err(VerifyError::Invalid));
    };
    if is_expired(&row.created_at, now) {
        return Ok(Err(VerifyError::Expired));
    }
    Ok(Ok(()))
}

/// Check a submitted code. On success the row is marked verified (terminal);
/// the caller performs any follow-up state changes (activation, reset).
pub fn verify(
    db: &Database,
    user_id: &str,
    code: &str,
    kind: OtpKind,
    now: DateTime<Utc>,
) -> Result<Result<OtpRow, VerifyError>> {
    let Some(row) = db.find_pending_otp(user_id, code, kind.as_str())? else {
        return Ok(Err(VerifyError::Invalid));
    };

    if is_expired(&row.created_at, now) {
        return Ok(Err(VerifyError::Expired));
    }

    db.mark_otp_verified(&row.id)?;
    Ok(Ok(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "B", "employee", None)
            .unwrap();
        db
    }

    fn backdate(db: &Database, otp_id: &str, minutes: i64) {
        let past = (Utc::now() - Duration::minutes(minutes)).to_rfc3339();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE otps SET created_at = ?2 WHERE id = ?1",
                rusqlite::params![otp_id, past],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn expiry_boundary() {
        let created = Utc::now();
        let raw = created.to_rfc3339();
        assert!(!is_expired(&raw, created + Duration::minutes(5)));
        assert!(is_expired(&raw, created + Duration::minutes(5) + Duration::seconds(1)));
        assert!(is_expired("not a timestamp", created));
    }

    #[test]
    fn fresh_code_verifies_and_becomes_terminal() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::EmailVerification).unwrap();

        let outcome = verify(&db, "u1", &otp.code, OtpKind::EmailVerification, Utc::now()).unwrap();
        assert!(outcome.is_ok());

        // second submission of the same code is invalid, not expired
        let outcome = verify(&db, "u1", &otp.code, OtpKind::EmailVerification, Utc::now()).unwrap();
        assert_eq!(outcome.unwrap_err(), VerifyError::Invalid);
    }

    #[test]
    fn wrong_code_is_invalid() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::EmailVerification).unwrap();
        let wrong = if otp.code == "000000" { "000001" } else { "000000" };

        let outcome = verify(&db, "u1", wrong, OtpKind::EmailVerification, Utc::now()).unwrap();
        assert_eq!(outcome.unwrap_err(), VerifyError::Invalid);
    }

    #[test]
    fn stale_code_is_expired_not_invalid() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::PasswordReset).unwrap();
        backdate(&db, &otp.id, 6);

        let outcome = verify(&db, "u1", &otp.code, OtpKind::PasswordReset, Utc::now()).unwrap();
        assert_eq!(outcome.unwrap_err(), VerifyError::Expired);
    }

    #[test]
    fn code_just_inside_window_still_verifies() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::PasswordReset).unwrap();
        backdate(&db, &otp.id, 4);

        let outcome = verify(&db, "u1", &otp.code, OtpKind::PasswordReset, Utc::now()).unwrap();
        assert!(outcome.is_ok());
    }

    #[test]
    fn peek_leaves_the_code_usable() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::PasswordReset).unwrap();

        assert!(peek(&db, "u1", &otp.code, OtpKind::PasswordReset, Utc::now())
            .unwrap()
            .is_ok());
        // still consumable afterwards
        assert!(verify(&db, "u1", &otp.code, OtpKind::PasswordReset, Utc::now())
            .unwrap()
            .is_ok());
    }

    #[test]
    fn kind_mismatch_is_invalid() {
        let db = db_with_user();
        let otp = issue(&db, "u1", OtpKind::EmailVerification).unwrap();

        let outcome = verify(&db, "u1", &otp.code, OtpKind::PasswordReset, Utc::now()).unwrap();
        assert_eq!(outcome.unwrap_err(), VerifyError::Invalid);
    }
}
