// SQLite ArtifactStore Implementation (append-only)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use gradeflow_core::domain::Artifact;
use gradeflow_core::error::Result;
use gradeflow_core::port::ArtifactStore;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteArtifactStore {
    pool: SqlitePool,
}

impl SqliteArtifactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    async fn put(&self, artifact: &Artifact) -> Result<()> {
        // Plain INSERT: the path primary key turns a second write into Conflict
        sqlx::query(
            r#"
            INSERT INTO artifacts (path, assignment, email, persisted_at, content_type, body)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.path)
        .bind(&artifact.assignment)
        .bind(&artifact.email)
        .bind(artifact.persisted_at)
        .bind(&artifact.content_type)
        .bind(&artifact.body)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(path = %artifact.path, bytes = artifact.body.len(), "Artifact persisted");
        Ok(())
    }

    async fn list(&self, assignment: &str) -> Result<Vec<Artifact>> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            r#"
            SELECT path, assignment, email, persisted_at, content_type, body
            FROM artifacts
            WHERE assignment = ?
            ORDER BY persisted_at ASC, path ASC
            "#,
        )
        .bind(assignment)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArtifactRow::into_artifact).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArtifactRow {
    path: String,
    assignment: String,
    email: String,
    persisted_at: i64,
    content_type: String,
    body: String,
}

impl ArtifactRow {
    fn into_artifact(self) -> Artifact {
        Artifact {
            path: self.path,
            assignment: self.assignment,
            email: self.email,
            persisted_at: self.persisted_at,
            content_type: self.content_type,
            body: self.body,
        }
    }
}
