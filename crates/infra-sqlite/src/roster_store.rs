// SQLite RosterStore Implementation
// Keyset pagination: the continuation token is the last key of the previous page

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use gradeflow_core::error::Result;
use gradeflow_core::port::{
    AssignmentRecord, ContinuationToken, CredentialRecord, Page, RosterStore,
};
use sqlx::SqlitePool;

pub struct SqliteRosterStore {
    pool: SqlitePool,
    page_size: usize,
}

impl SqliteRosterStore {
    pub fn new(pool: SqlitePool, page_size: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
        }
    }

    /// Insert or replace an assignment row (roster administration)
    pub async fn upsert_assignment(&self, record: &AssignmentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assignments (project, teacher_email, grader_url)
            VALUES (?, ?, ?)
            ON CONFLICT(project) DO UPDATE
            SET teacher_email = excluded.teacher_email, grader_url = excluded.grader_url
            "#,
        )
        .bind(&record.project)
        .bind(&record.teacher_email)
        .bind(&record.grader_url)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Insert or replace a student's grading credential
    pub async fn upsert_credential(&self, record: &CredentialRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (project, email, credentials)
            VALUES (?, ?, ?)
            ON CONFLICT(project, email) DO UPDATE SET credentials = excluded.credentials
            "#,
        )
        .bind(&record.project)
        .bind(&record.email)
        .bind(&record.credentials)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Fetch one extra row to learn whether another page follows
    fn fetch_limit(&self) -> i64 {
        self.page_size as i64 + 1
    }

    fn paginate<R, T>(&self, mut rows: Vec<R>, key: impl Fn(&R) -> String) -> Page<T>
    where
        R: Into<T>,
    {
        let continuation = if rows.len() > self.page_size {
            rows.truncate(self.page_size);
            rows.last().map(&key)
        } else {
            None
        };
        Page {
            items: rows.into_iter().map(Into::into).collect(),
            continuation,
        }
    }
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn assignments_page(
        &self,
        continuation: Option<ContinuationToken>,
    ) -> Result<Page<AssignmentRecord>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT project, teacher_email, grader_url
            FROM assignments
            WHERE project > ?
            ORDER BY project ASC
            LIMIT ?
            "#,
        )
        .bind(continuation.unwrap_or_default())
        .bind(self.fetch_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(self.paginate(rows, |r| r.project.clone()))
    }

    async fn credentials_page(
        &self,
        project: &str,
        continuation: Option<ContinuationToken>,
    ) -> Result<Page<CredentialRecord>> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT project, email, credentials
            FROM credentials
            WHERE project = ? AND email > ?
            ORDER BY email ASC
            LIMIT ?
            "#,
        )
        .bind(project)
        .bind(continuation.unwrap_or_default())
        .bind(self.fetch_limit())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(self.paginate(rows, |r| r.email.clone()))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    project: String,
    teacher_email: String,
    grader_url: String,
}

impl From<AssignmentRow> for AssignmentRecord {
    fn from(row: AssignmentRow) -> Self {
        Self {
            project: row.project,
            teacher_email: row.teacher_email,
            grader_url: row.grader_url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    project: String,
    email: String,
    credentials: String,
}

impl From<CredentialRow> for CredentialRecord {
    fn from(row: CredentialRow) -> Self {
        Self {
            project: row.project,
            email: row.email,
            credentials: row.credentials,
        }
    }
}
