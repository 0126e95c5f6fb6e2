use crate::models::{ProfileRow, UserRow, UserSummaryRow};
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,
    pub skills: Option<String>,
    pub education: Option<String>,
    pub experience: Option<String>,
    pub profile_image: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub company_image: Option<String>,
}

impl Database {
    /// Insert a user and its role profile in one transaction. The account
    /// starts inactive until email verification.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        role: &str,
        company_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, email, password, first_name, last_name, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![id, email, password_hash, first_name, last_name, now_rfc3339()],
            )?;
            tx.execute(
                "INSERT INTO profiles (user_id, role, company_name) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, role, company_name],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT user_id, role, is_email_verified, phone_number, skills, education,
                            experience, profile_image, company_name, address, company_image
                     FROM profiles WHERE user_id = ?1",
                )?
                .query_row([user_id], |row| {
                    Ok(ProfileRow {
                        user_id: row.get(0)?,
                        role: row.get(1)?,
                        is_email_verified: row.get(2)?,
                        phone_number: row.get(3)?,
                        skills: row.get(4)?,
                        education: row.get(5)?,
                        experience: row.get(6)?,
                        profile_image: row.get(7)?,
                        company_name: row.get(8)?,
                        address: row.get(9)?,
                        company_image: row.get(10)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_summary(&self, id: &str) -> Result<Option<UserSummaryRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT u.id, u.first_name, u.last_name, u.email, p.role
                     FROM users u JOIN profiles p ON p.user_id = u.id
                     WHERE u.id = ?1",
                )?
                .query_row([id], map_summary)
                .optional()?;
            Ok(row)
        })
    }

    /// Flip both verification flags on successful email OTP verification.
    pub fn mark_email_verified(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE users SET is_active = 1 WHERE id = ?1", [user_id])?;
            tx.execute(
                "UPDATE profiles SET is_email_verified = 1 WHERE user_id = ?1",
                [user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn set_password(&self, user_id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                rusqlite::params![user_id, password_hash],
            )?;
            Ok(())
        })
    }

    pub fn update_user_names(
        &self,
        user_id: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    first_name = COALESCE(?2, first_name),
                    last_name  = COALESCE(?3, last_name)
                 WHERE id = ?1",
                rusqlite::params![user_id, first_name, last_name],
            )?;
            Ok(())
        })
    }

    pub fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE profiles SET
                    phone_number  = COALESCE(?2, phone_number),
                    skills        = COALESCE(?3, skills),
                    education     = COALESCE(?4, education),
                    experience    = COALESCE(?5, experience),
                    profile_image = COALESCE(?6, profile_image),
                    company_name  = COALESCE(?7, company_name),
                    address       = COALESCE(?8, address),
                    company_image = COALESCE(?9, company_image)
                 WHERE user_id = ?1",
                rusqlite::params![
                    user_id,
                    changes.phone_number,
                    changes.skills,
                    changes.education,
                    changes.experience,
                    changes.profile_image,
                    changes.company_name,
                    changes.address,
                    changes.company_image,
                ],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is a compile-time constant, never user input
    let sql = format!(
        "SELECT id, email, password, first_name, last_name, is_active, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let row = conn
        .prepare(&sql)?
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                is_active: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(row)
}

pub(crate) fn map_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserSummaryRow> {
    Ok(UserSummaryRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        role: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::ProfileChanges;

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "hash", "Ada", "Lovelace", "employee", None)
            .unwrap();

        let user = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(!user.is_active);

        let profile = db.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.role, "employee");
        assert!(!profile.is_email_verified);
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "B", "employee", None)
            .unwrap();
        let err = db.create_user("u2", "a@x.com", "h", "C", "D", "employer", None);
        assert!(err.is_err());
    }

    #[test]
    fn mark_email_verified_flips_both_flags() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "B", "employee", None)
            .unwrap();
        db.mark_email_verified("u1").unwrap();

        assert!(db.get_user_by_id("u1").unwrap().unwrap().is_active);
        assert!(db.get_profile("u1").unwrap().unwrap().is_email_verified);
    }

    #[test]
    fn profile_update_preserves_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "c@x.com", "h", "A", "B", "company", Some("Acme"))
            .unwrap();

        db.update_profile(
            "u1",
            &ProfileChanges {
                address: Some("1 Main St".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let profile = db.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.company_name.as_deref(), Some("Acme"));
        assert_eq!(profile.address.as_deref(), Some("1 Main St"));
    }
}
