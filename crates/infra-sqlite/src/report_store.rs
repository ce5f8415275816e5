// SQLite ReportStore Implementation (writes replace)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use gradeflow_core::error::Result;
use gradeflow_core::port::{ReportStore, StoredReport};
use sqlx::SqlitePool;

pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn put(&self, report: &StoredReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (path, content_type, body, written_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE
            SET content_type = excluded.content_type,
                body = excluded.body,
                written_at = excluded.written_at
            "#,
        )
        .bind(&report.path)
        .bind(&report.content_type)
        .bind(&report.body)
        .bind(report.written_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<StoredReport>> {
        let row = sqlx::query_as::<_, ReportRow>(
            "SELECT path, content_type, body, written_at FROM reports WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| StoredReport {
            path: r.path,
            content_type: r.content_type,
            body: r.body,
            written_at: r.written_at,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    path: String,
    content_type: String,
    body: String,
    written_at: i64,
}
