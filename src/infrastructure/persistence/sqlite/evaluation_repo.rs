//! SQLite Evaluation Repository - 评估报告（只追加）

use async_trait::async_trait;
use uuid::Uuid;

use super::database::{db_error, from_json, insert_error, to_json};
use super::DbPool;
use crate::application::ports::{EvaluationRepositoryPort, RepositoryError};
use crate::domain::evaluation::EvaluationReport;

/// SQLite Evaluation Repository
pub struct SqliteEvaluationRepository {
    pool: DbPool,
}

impl SqliteEvaluationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationRepositoryPort for SqliteEvaluationRepository {
    async fn insert(&self, report: &EvaluationReport) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_reports (id, artifact_id, artifact_type, mode, overall_score, passed, report, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(report.artifact_id.to_string())
        .bind(report.artifact_type.as_str())
        .bind(report.mode.as_str())
        .bind(report.overall_score)
        .bind(report.passed)
        .bind(to_json(report)?)
        .bind(report.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EvaluationReport>, RepositoryError> {
        let raw: Option<(String,)> =
            sqlx::query_as("SELECT report FROM evaluation_reports WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        raw.map(|(report,)| from_json(&report)).transpose()
    }

    async fn list_by_artifact(
        &self,
        artifact_id: Uuid,
    ) -> Result<Vec<EvaluationReport>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT report FROM evaluation_reports WHERE artifact_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(artifact_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(|(report,)| from_json(report)).collect()
    }
}
