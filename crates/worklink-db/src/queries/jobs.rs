use crate::models::{JobListingRow, JobRow};
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;

/// Whitelisted sort orders for job listings. Anything else falls back to
/// newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    TitleAsc,
    TitleDesc,
    SalaryMinAsc,
    SalaryMinDesc,
    SalaryMaxAsc,
    SalaryMaxDesc,
    CompanyAsc,
    CompanyDesc,
    LocationAsc,
    LocationDesc,
}

impl JobSort {
    pub fn parse(s: &str) -> Self {
        match s {
            "created_at" => JobSort::CreatedAsc,
            "-created_at" => JobSort::CreatedDesc,
            "title" => JobSort::TitleAsc,
            "-title" => JobSort::TitleDesc,
            "salary_min" => JobSort::SalaryMinAsc,
            "-salary_min" => JobSort::SalaryMinDesc,
            "salary_max" => JobSort::SalaryMaxAsc,
            "-salary_max" => JobSort::SalaryMaxDesc,
            "company_name" => JobSort::CompanyAsc,
            "-company_name" => JobSort::CompanyDesc,
            "location" => JobSort::LocationAsc,
            "-location" => JobSort::LocationDesc,
            _ => JobSort::CreatedDesc,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            JobSort::CreatedDesc => "j.created_at DESC",
            JobSort::CreatedAsc => "j.created_at ASC",
            JobSort::TitleAsc => "j.title ASC",
            JobSort::TitleDesc => "j.title DESC",
            JobSort::SalaryMinAsc => "j.salary_min ASC",
            JobSort::SalaryMinDesc => "j.salary_min DESC",
            JobSort::SalaryMaxAsc => "j.salary_max ASC",
            JobSort::SalaryMaxDesc => "j.salary_max DESC",
            JobSort::CompanyAsc => "j.company_name ASC",
            JobSort::CompanyDesc => "j.company_name DESC",
            JobSort::LocationAsc => "j.location ASC",
            JobSort::LocationDesc => "j.location DESC",
        }
    }
}

/// Search/filter parameters for the job catalog. Only active jobs are ever
/// returned through this path.
#[derive(Debug, Default)]
pub struct JobFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_types: Vec<String>,
    pub experience_levels: Vec<String>,
    pub company_name: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub skills: Vec<String>,
    /// YYYY-MM-DD, inclusive.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Exclude jobs posted by this user and jobs they already applied to.
    pub available_to: Option<String>,
    pub sort: JobSort,
    pub page: u32,
    pub page_size: u32,
}

impl JobFilter {
    fn build_where(&self) -> (String, Vec<Value>) {
        let mut clauses = vec!["j.is_active = 1".to_string()];
        let mut params: Vec<Value> = Vec::new();

        let like = |term: &str| -> Value { Value::Text(format!("%{}%", term)) };

        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let p = params.len() + 1;
            clauses.push(format!(
                "(j.title LIKE ?{p} OR j.description LIKE ?{p} OR j.company_name LIKE ?{p} \
                 OR j.skills_required LIKE ?{p} OR j.location LIKE ?{p})"
            ));
            params.push(like(search.trim()));
        }
        if let Some(location) = &self.location {
            clauses.push(format!("j.location LIKE ?{}", params.len() + 1));
            params.push(like(location));
        }
        if !self.job_types.is_empty() {
            let placeholders: Vec<String> = (0..self.job_types.len())
                .map(|i| format!("?{}", params.len() + 1 + i))
                .collect();
            clauses.push(format!("j.job_type IN ({})", placeholders.join(", ")));
            params.extend(self.job_types.iter().cloned().map(Value::Text));
        }
        if !self.experience_levels.is_empty() {
            let placeholders: Vec<String> = (0..self.experience_levels.len())
                .map(|i| format!("?{}", params.len() + 1 + i))
                .collect();
            clauses.push(format!(
                "j.experience_level IN ({})",
                placeholders.join(", ")
            ));
            params.extend(self.experience_levels.iter().cloned().map(Value::Text));
        }
        if let Some(company) = &self.company_name {
            clauses.push(format!("j.company_name LIKE ?{}", params.len() + 1));
            params.push(like(company));
        }
        // Salary filters match overlapping ranges: a wanted minimum must be
        // covered by the job's maximum and vice versa.
        if let Some(min) = self.salary_min {
            clauses.push(format!("j.salary_max >= ?{}", params.len() + 1));
            params.push(Value::Real(min));
        }
        if let Some(max) = self.salary_max {
            clauses.push(format!("j.salary_min <= ?{}", params.len() + 1));
            params.push(Value::Real(max));
        }
        if !self.skills.is_empty() {
            let ors: Vec<String> = (0..self.skills.len())
                .map(|i| format!("j.skills_required LIKE ?{}", params.len() + 1 + i))
                .collect();
            clauses.push(format!("({})", ors.join(" OR ")));
            params.extend(self.skills.iter().map(|s| like(s)));
        }
        if let Some(from) = &self.date_from {
            clauses.push(format!("date(j.created_at) >= ?{}", params.len() + 1));
            params.push(Value::Text(from.clone()));
        }
        if let Some(to) = &self.date_to {
            clauses.push(format!("date(j.created_at) <= ?{}", params.len() + 1));
            params.push(Value::Text(to.clone()));
        }
        if let Some(user_id) = &self.available_to {
            let p1 = params.len() + 1;
            clauses.push(format!("j.posted_by != ?{p1}"));
            params.push(Value::Text(user_id.clone()));
            let p2 = params.len() + 1;
            clauses.push(format!(
                "j.id NOT IN (SELECT job_id FROM applications WHERE applicant_id = ?{p2})"
            ));
            params.push(Value::Text(user_id.clone()));
        }

        (clauses.join(" AND "), params)
    }
}

/// Partial job update. `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub skills_required: Option<String>,
    pub is_active: Option<bool>,
}

const LISTING_SELECT: &str = "
    SELECT j.id, j.posted_by, j.title, j.description, j.company_name, j.location,
           j.job_type, j.experience_level, j.salary_min, j.salary_max,
           j.skills_required, j.is_active, j.created_at, j.updated_at,
           u.first_name || ' ' || u.last_name, u.email,
           (SELECT COUNT(*) FROM applications a WHERE a.job_id = j.id)
    FROM jobs j
    JOIN users u ON u.id = j.posted_by";

fn map_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobListingRow> {
    Ok(JobListingRow {
        job: JobRow {
            id: row.get(0)?,
            posted_by: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            company_name: row.get(4)?,
            location: row.get(5)?,
            job_type: row.get(6)?,
            experience_level: row.get(7)?,
            salary_min: row.get(8)?,
            salary_max: row.get(9)?,
            skills_required: row.get(10)?,
            is_active: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        },
        posted_by_name: row.get(14)?,
        posted_by_email: row.get(15)?,
        applications_count: row.get::<_, i64>(16)? as u64,
    })
}

impl Database {
    pub fn create_job(
        &self,
        id: &str,
        posted_by: &str,
        title: &str,
        description: &str,
        company_name: &str,
        location: &str,
        job_type: &str,
        experience_level: &str,
        salary_min: Option<f64>,
        salary_max: Option<f64>,
        skills_required: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO jobs (id, posted_by, title, description, company_name, location,
                                   job_type, experience_level, salary_min, salary_max,
                                   skills_required, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)",
                rusqlite::params![
                    id,
                    posted_by,
                    title,
                    description,
                    company_name,
                    location,
                    job_type,
                    experience_level,
                    salary_min,
                    salary_max,
                    skills_required,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_job(&self, id: &str) -> Result<Option<JobRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, posted_by, title, description, company_name, location,
                            job_type, experience_level, salary_min, salary_max,
                            skills_required, is_active, created_at, updated_at
                     FROM jobs WHERE id = ?1",
                )?
                .query_row([id], |row| {
                    Ok(JobRow {
                        id: row.get(0)?,
                        posted_by: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        company_name: row.get(4)?,
                        location: row.get(5)?,
                        job_type: row.get(6)?,
                        experience_level: row.get(7)?,
                        salary_min: row.get(8)?,
                        salary_max: row.get(9)?,
                        skills_required: row.get(10)?,
                        is_active: row.get(11)?,
                        created_at: row.get(12)?,
                        updated_at: row.get(13)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_job_listing(&self, id: &str) -> Result<Option<JobListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE j.id = ?1", LISTING_SELECT);
            let row = conn.prepare(&sql)?.query_row([id], map_listing).optional()?;
            Ok(row)
        })
    }

    /// Filtered, sorted, paginated listing of active jobs plus the unpaginated
    /// match count.
    pub fn list_jobs(&self, filter: &JobFilter) -> Result<(Vec<JobListingRow>, u64)> {
        self.with_conn(|conn| {
            let (where_sql, params) = filter.build_where();

            let count_sql = format!(
                "SELECT COUNT(*) FROM jobs j JOIN users u ON u.id = j.posted_by WHERE {}",
                where_sql
            );
            let total: i64 = conn.prepare(&count_sql)?.query_row(
                rusqlite::params_from_iter(params.iter()),
                |row| row.get(0),
            )?;

            // u64 arithmetic: page * page_size must not wrap for any u32 page
            let page_size = filter.page_size.max(1) as u64;
            let offset = (filter.page.max(1) as u64 - 1) * page_size;
            let sql = format!(
                "{} WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
                LISTING_SELECT,
                where_sql,
                filter.sort.order_clause(),
                page_size,
                offset
            );

            let rows = conn
                .prepare(&sql)?
                .query_map(rusqlite::params_from_iter(params.iter()), map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total as u64))
        })
    }

    /// Jobs posted by one user, newest first, regardless of active flag.
    pub fn list_jobs_by_poster(&self, user_id: &str) -> Result<Vec<JobListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE j.posted_by = ?1 ORDER BY j.created_at DESC",
                LISTING_SELECT
            );
            let rows = conn
                .prepare(&sql)?
                .query_map([user_id], map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_job(&self, id: &str, changes: &JobChanges) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE jobs SET
                    title            = COALESCE(?2, title),
                    description      = COALESCE(?3, description),
                    company_name     = COALESCE(?4, company_name),
                    location         = COALESCE(?5, location),
                    job_type         = COALESCE(?6, job_type),
                    experience_level = COALESCE(?7, experience_level),
                    salary_min       = COALESCE(?8, salary_min),
                    salary_max       = COALESCE(?9, salary_max),
                    skills_required  = COALESCE(?10, skills_required),
                    is_active        = COALESCE(?11, is_active),
                    updated_at       = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.title,
                    changes.description,
                    changes.company_name,
                    changes.location,
                    changes.job_type,
                    changes.experience_level,
                    changes.salary_min,
                    changes.salary_max,
                    changes.skills_required,
                    changes.is_active,
                    now_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_job(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Distinct locations and company names among active jobs, for the
    /// filter-options endpoint.
    pub fn job_filter_values(&self) -> Result<(Vec<String>, Vec<String>)> {
        self.with_conn(|conn| {
            let locations = conn
                .prepare("SELECT DISTINCT location FROM jobs WHERE is_active = 1 ORDER BY location")?
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            let companies = conn
                .prepare(
                    "SELECT DISTINCT company_name FROM jobs WHERE is_active = 1 ORDER BY company_name",
                )?
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok((locations, companies))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{JobFilter, JobSort};
    use crate::Database;

    fn seed(db: &Database) {
        db.create_user("e1", "emp@x.com", "h", "Eve", "Employer", "employer", None)
            .unwrap();
        db.create_job(
            "j1",
            "e1",
            "Rust Engineer",
            "Systems work",
            "Acme",
            "Berlin",
            "full_time",
            "senior",
            Some(90000.0),
            Some(120000.0),
            "rust, sql",
        )
        .unwrap();
        db.create_job(
            "j2",
            "e1",
            "Support Agent",
            "Helpdesk",
            "Globex",
            "Remote",
            "part_time",
            "entry",
            Some(20000.0),
            Some(30000.0),
            "communication",
        )
        .unwrap();
    }

    fn base_filter() -> JobFilter {
        JobFilter {
            page: 1,
            page_size: 10,
            ..Default::default()
        }
    }

    #[test]
    fn search_matches_title_and_skills() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let (rows, total) = db
            .list_jobs(&JobFilter {
                search: Some("rust".into()),
                ..base_filter()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].job.id, "j1");
    }

    #[test]
    fn salary_filter_matches_overlapping_range() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let (rows, _) = db
            .list_jobs(&JobFilter {
                salary_min: Some(100000.0),
                ..base_filter()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job.id, "j1");
    }

    #[test]
    fn deactivated_jobs_drop_out_of_listings() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        db.update_job(
            "j1",
            &super::JobChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let (rows, total) = db.list_jobs(&base_filter()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].job.id, "j2");

        // but still visible to its poster
        assert_eq!(db.list_jobs_by_poster("e1").unwrap().len(), 2);
    }

    #[test]
    fn pagination_and_sort() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let (rows, total) = db
            .list_jobs(&JobFilter {
                sort: JobSort::TitleAsc,
                page: 1,
                page_size: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job.title, "Rust Engineer");

        let (rows, _) = db
            .list_jobs(&JobFilter {
                sort: JobSort::TitleAsc,
                page: 2,
                page_size: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows[0].job.title, "Support Agent");
    }

    #[test]
    fn huge_page_numbers_yield_an_empty_page() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let (rows, total) = db
            .list_jobs(&JobFilter {
                page: u32::MAX,
                page_size: 100,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert!(rows.is_empty());
    }

    #[test]
    fn available_to_excludes_own_and_applied() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.create_user("a1", "app@x.com", "h", "Al", "Applicant", "employee", None)
            .unwrap();
        db.create_application("ap1", "j1", "a1", None, None, None, None, None)
            .unwrap();

        let (rows, total) = db
            .list_jobs(&JobFilter {
                available_to: Some("a1".into()),
                ..base_filter()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].job.id, "j2");

        // the poster sees nothing available
        let (_, total) = db
            .list_jobs(&JobFilter {
                available_to: Some("e1".into()),
                ..base_filter()
            })
            .unwrap();
        assert_eq!(total, 0);
    }
}
