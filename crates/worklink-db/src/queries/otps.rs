use crate::models::OtpRow;
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::OptionalExtension;

impl Database {
    /// Issue a fresh OTP, superseding any unverified one of the same kind.
    /// At most one unverified OTP per (user, kind) exists at any time.
    pub fn replace_otp(&self, id: &str, user_id: &str, code: &str, kind: &str) -> Result<OtpRow> {
        self.with_conn_mut(|conn| {
            let created_at = now_rfc3339();
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM otps WHERE user_id = ?1 AND kind = ?2 AND is_verified = 0",
                rusqlite::params![user_id, kind],
            )?;
            tx.execute(
                "INSERT INTO otps (id, user_id, code, kind, created_at, is_verified)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                rusqlite::params![id, user_id, code, kind, created_at],
            )?;
            tx.commit()?;
            Ok(OtpRow {
                id: id.to_string(),
                user_id: user_id.to_string(),
                code: code.to_string(),
                kind: kind.to_string(),
                created_at,
                is_verified: false,
            })
        })
    }

    /// Unverified OTP matching (user, code, kind), if any. Expiry is the
    /// caller's concern — it is a function of created_at, not stored state.
    pub fn find_pending_otp(&self, user_id: &str, code: &str, kind: &str) -> Result<Option<OtpRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, user_id, code, kind, created_at, is_verified
                     FROM otps
                     WHERE user_id = ?1 AND code = ?2 AND kind = ?3 AND is_verified = 0",
                )?
                .query_row(rusqlite::params![user_id, code, kind], |row| {
                    Ok(OtpRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        code: row.get(2)?,
                        kind: row.get(3)?,
                        created_at: row.get(4)?,
                        is_verified: row.get(5)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Terminal state: a verified OTP can never match again.
    pub fn mark_otp_verified(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE otps SET is_verified = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "B", "employee", None)
            .unwrap();
        db
    }

    #[test]
    fn reissue_supersedes_prior_code() {
        let db = db_with_user();
        db.replace_otp("o1", "u1", "111111", "email_verification")
            .unwrap();
        db.replace_otp("o2", "u1", "222222", "email_verification")
            .unwrap();

        assert!(db
            .find_pending_otp("u1", "111111", "email_verification")
            .unwrap()
            .is_none());
        assert!(db
            .find_pending_otp("u1", "222222", "email_verification")
            .unwrap()
            .is_some());
    }

    #[test]
    fn kinds_do_not_supersede_each_other() {
        let db = db_with_user();
        db.replace_otp("o1", "u1", "111111", "email_verification")
            .unwrap();
        db.replace_otp("o2", "u1", "222222", "password_reset")
            .unwrap();

        assert!(db
            .find_pending_otp("u1", "111111", "email_verification")
            .unwrap()
            .is_some());
        assert!(db
            .find_pending_otp("u1", "222222", "password_reset")
            .unwrap()
            .is_some());
    }

    #[test]
    fn verified_otp_never_matches_again() {
        let db = db_with_user();
        let otp = db
            .replace_otp("o1", "u1", "123456", "password_reset")
            .unwrap();
        db.mark_otp_verified(&otp.id).unwrap();

        assert!(db
            .find_pending_otp("u1", "123456", "password_reset")
            .unwrap()
            .is_none());
    }

    #[test]
    fn wrong_code_does_not_match() {
        let db = db_with_user();
        db.replace_otp("o1", "u1", "123456", "email_verification")
            .unwrap();
        assert!(db
            .find_pending_otp("u1", "654321", "email_verification")
            .unwrap()
            .is_none());
    }
}
