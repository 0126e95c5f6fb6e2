use crate::models::{ApplicationDetailRow, ApplicationRow};
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;

const DETAIL_SELECT: &str = "
    SELECT a.id, a.job_id, a.applicant_id, a.status, a.resume, a.cover_letter,
           a.applicant_phone, a.expected_salary, a.available_from, a.applied_at, a.updated_at,
           u.first_name || ' ' || u.last_name, u.email, p.role,
           j.title, j.company_name, j.location, j.posted_by
    FROM applications a
    JOIN users u ON u.id = a.applicant_id
    JOIN profiles p ON p.user_id = a.applicant_id
    JOIN jobs j ON j.id = a.job_id";

fn map_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApplicationDetailRow> {
    Ok(ApplicationDetailRow {
        application: ApplicationRow {
            id: row.get(0)?,
            job_id: row.get(1)?,
            applicant_id: row.get(2)?,
            status: row.get(3)?,
            resume: row.get(4)?,
            cover_letter: row.get(5)?,
            applicant_phone: row.get(6)?,
            expected_salary: row.get(7)?,
            available_from: row.get(8)?,
            applied_at: row.get(9)?,
            updated_at: row.get(10)?,
        },
        applicant_name: row.get(11)?,
        applicant_email: row.get(12)?,
        applicant_role: row.get(13)?,
        job_title: row.get(14)?,
        job_company: row.get(15)?,
        job_location: row.get(16)?,
        job_posted_by: row.get(17)?,
    })
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn create_application(
        &self,
        id: &str,
        job_id: &str,
        applicant_id: &str,
        resume: Option<&str>,
        cover_letter: Option<&str>,
        applicant_phone: Option<&str>,
        expected_salary: Option<f64>,
        available_from: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO applications (id, job_id, applicant_id, status, resume, cover_letter,
                                           applicant_phone, expected_salary, available_from,
                                           applied_at, updated_at)
                 VALUES (?1, ?2, ?3, 'applied', ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    job_id,
                    applicant_id,
                    resume,
                    cover_letter,
                    applicant_phone,
                    expected_salary,
                    available_from,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    /// Prior application for the duplicate check; the handler surfaces its
    /// status and timestamp instead of creating a second row.
    pub fn get_application_for(
        &self,
        job_id: &str,
        applicant_id: &str,
    ) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, job_id, applicant_id, status, resume, cover_letter,
                            applicant_phone, expected_salary, available_from, applied_at, updated_at
                     FROM applications WHERE job_id = ?1 AND applicant_id = ?2",
                )?
                .query_row([job_id, applicant_id], |row| {
                    Ok(ApplicationRow {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        applicant_id: row.get(2)?,
                        status: row.get(3)?,
                        resume: row.get(4)?,
                        cover_letter: row.get(5)?,
                        applicant_phone: row.get(6)?,
                        expected_salary: row.get(7)?,
                        available_from: row.get(8)?,
                        applied_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_application_detail(&self, id: &str) -> Result<Option<ApplicationDetailRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE a.id = ?1", DETAIL_SELECT);
            let row = conn.prepare(&sql)?.query_row([id], map_detail).optional()?;
            Ok(row)
        })
    }

    /// Applications submitted by one user, optionally filtered by status and a
    /// search term over job title / company.
    pub fn list_applications_by_applicant(
        &self,
        applicant_id: &str,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<ApplicationDetailRow>> {
        self.list_applications("a.applicant_id = ?1", applicant_id, status, search)
    }

    /// Applications received across all jobs posted by one user.
    pub fn list_applications_received(
        &self,
        poster_id: &str,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<ApplicationDetailRow>> {
        self.list_applications("j.posted_by = ?1", poster_id, status, search)
    }

    /// Applications for a single job.
    pub fn list_applications_for_job(
        &self,
        job_id: &str,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<ApplicationDetailRow>> {
        self.list_applications("a.job_id = ?1", job_id, status, search)
    }

    fn list_applications(
        &self,
        anchor_clause: &str,
        anchor_value: &str,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<ApplicationDetailRow>> {
        self.with_conn(|conn| {
            let mut clauses = vec![anchor_clause.to_string()];
            let mut params: Vec<Value> = vec![Value::Text(anchor_value.to_string())];

            if let Some(status) = status {
                clauses.push(format!("a.status = ?{}", params.len() + 1));
                params.push(Value::Text(status.to_string()));
            }
            if let Some(search) = search {
                let p = params.len() + 1;
                clauses.push(format!(
                    "(j.title LIKE ?{p} OR j.company_name LIKE ?{p} \
                     OR u.first_name LIKE ?{p} OR u.last_name LIKE ?{p})"
                ));
                params.push(Value::Text(format!("%{}%", search)));
            }

            let sql = format!(
                "{} WHERE {} ORDER BY a.applied_at DESC",
                DETAIL_SELECT,
                clauses.join(" AND ")
            );
            let rows = conn
                .prepare(&sql)?
                .query_map(rusqlite::params_from_iter(params.iter()), map_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_application_status(&self, id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE applications SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, status, now_rfc3339()],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("e1", "emp@x.com", "h", "Eve", "Employer", "employer", None)
            .unwrap();
        db.create_user("a1", "app@x.com", "h", "Al", "Applicant", "employee", None)
            .unwrap();
        db.create_job(
            "j1", "e1", "Rust Engineer", "desc", "Acme", "Berlin", "full_time", "senior",
            None, None, "rust",
        )
        .unwrap();
        db
    }

    #[test]
    fn duplicate_application_violates_unique_pair() {
        let db = seeded();
        db.create_application("ap1", "j1", "a1", None, None, None, None, None)
            .unwrap();
        let second = db.create_application("ap2", "j1", "a1", None, None, None, None, None);
        assert!(second.is_err());

        let prior = db.get_application_for("j1", "a1").unwrap().unwrap();
        assert_eq!(prior.id, "ap1");
        assert_eq!(prior.status, "applied");
    }

    #[test]
    fn status_update_round_trips() {
        let db = seeded();
        db.create_application("ap1", "j1", "a1", None, None, None, None, None)
            .unwrap();
        db.update_application_status("ap1", "shortlisted").unwrap();

        let detail = db.get_application_detail("ap1").unwrap().unwrap();
        assert_eq!(detail.application.status, "shortlisted");
        assert_eq!(detail.job_posted_by, "e1");
        assert_eq!(detail.applicant_role, "employee");
    }

    #[test]
    fn received_and_submitted_views_line_up() {
        let db = seeded();
        db.create_application("ap1", "j1", "a1", None, Some("letter"), None, None, None)
            .unwrap();

        let submitted = db
            .list_applications_by_applicant("a1", None, None)
            .unwrap();
        assert_eq!(submitted.len(), 1);

        let received = db.list_applications_received("e1", None, None).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].application.id, "ap1");

        let filtered = db
            .list_applications_received("e1", Some("rejected"), None)
            .unwrap();
        assert!(filtered.is_empty());
    }
}
