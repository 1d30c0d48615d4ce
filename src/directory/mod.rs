//! Narrow read-only interface to the platform's domain data.
//!
//! The job, favorite and account tables belong to the wider platform; this
//! crate only queries them. [`SqliteJobDirectory`] never creates or migrates
//! those tables.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

/// A favorited job whose deadline falls on a queried date, joined with the
/// favoriting user.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteJobDeadline {
    pub user_id: usize,
    pub job_post_id: i64,
    pub job_title: String,
    pub company_name: String,
    pub deadline: NaiveDate,
}

/// A company-owned job whose deadline falls on a queried date.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyJobDeadline {
    pub company_user_id: usize,
    pub job_post_id: i64,
    pub job_title: String,
    pub company_name: String,
    pub deadline: NaiveDate,
}

/// Domain queries the deadline scheduler and moderation fan-out consume.
pub trait JobDirectory: Send + Sync {
    /// Favorited jobs whose deadline falls exactly on the given date, one
    /// row per (favoriting user, job) pair.
    fn favorite_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<FavoriteJobDeadline>>;

    /// Jobs whose deadline falls exactly on the given date, one row per job,
    /// addressed to the owning company account.
    fn company_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<CompanyJobDeadline>>;

    /// Identities of every admin account, for moderation-alert fan-out.
    fn admin_user_ids(&self) -> Result<Vec<usize>>;
}

pub struct SqliteJobDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobDirectory {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open platform database at {:?}", db_path.as_ref()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

impl JobDirectory for SqliteJobDirectory {
    fn favorite_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<FavoriteJobDeadline>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ufj.user_id, jp.id, jp.title, jp.company, date(jp.deadline)
               FROM user_favorite_job ufj
               JOIN job_post jp ON jp.id = ufj.job_post_id
              WHERE date(jp.deadline) = ?1",
        )?;

        let rows = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
                Ok((
                    row.get::<_, usize>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(user_id, job_post_id, job_title, company_name, raw_deadline)| {
                let deadline = NaiveDate::parse_from_str(&raw_deadline, DATE_FORMAT)
                    .with_context(|| format!("Invalid deadline date: {}", raw_deadline))?;
                Ok(FavoriteJobDeadline {
                    user_id,
                    job_post_id,
                    job_title,
                    company_name,
                    deadline,
                })
            })
            .collect()
    }

    fn company_jobs_with_deadline(&self, date: NaiveDate) -> Result<Vec<CompanyJobDeadline>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT jp.user_id, jp.id, jp.title, jp.company, date(jp.deadline)
               FROM job_post jp
              WHERE date(jp.deadline) = ?1",
        )?;

        let rows = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
                Ok((
                    row.get::<_, usize>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(company_user_id, job_post_id, job_title, company_name, raw_deadline)| {
                    let deadline = NaiveDate::parse_from_str(&raw_deadline, DATE_FORMAT)
                        .with_context(|| format!("Invalid deadline date: {}", raw_deadline))?;
                    Ok(CompanyJobDeadline {
                        company_user_id,
                        job_post_id,
                        job_title,
                        company_name,
                        deadline,
                    })
                },
            )
            .collect()
    }

    fn admin_user_ids(&self) -> Result<Vec<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM users WHERE role = 'ADMIN'")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<usize>, _>>()?;
        Ok(ids)
    }
}
