use crate::infrastructure::db::DbPool;
use crate::{
    domain::conversion::{Conversion, ConversionStatus, ConversionSummary},
    error::AppResult,
};
use std::sync::Arc;
use uuid::Uuid;

/// Job store for conversion records. Each job's row is written only by that
/// job's own orchestrator run; reads may happen concurrently at any time.
pub struct ConversionRepository {
    pool: Arc<DbPool>,
}

impl ConversionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Insert a freshly accepted upload with status `processing`.
    pub async fn create(
        &self,
        id: Uuid,
        filename: &str,
        original_filename: &str,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO conversions (id, filename, original_filename, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(filename)
        .bind(original_filename)
        .bind(ConversionStatus::Processing)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Record successful text extraction and enter the converting phase.
    pub async fn mark_converting(&self, id: Uuid, text_length: i64) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            UPDATE conversions
            SET status = $1, text_length = $2
            WHERE id = $3 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(ConversionStatus::Converting)
        .bind(text_length)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Terminal success: record the artifact. The status guard keeps
    /// terminal states final even if a stray write arrives late.
    pub async fn mark_completed(&self, id: Uuid, audio_file: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            UPDATE conversions
            SET status = $1, audio_file = $2
            WHERE id = $3 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(ConversionStatus::Completed)
        .bind(audio_file)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Terminal failure. Only the state is recorded, not the cause.
    pub async fn mark_failed(&self, id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            UPDATE conversions
            SET status = $1
            WHERE id = $2 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(ConversionStatus::Failed)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get a conversion by ID
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Conversion>> {
        let pool = self.pool.as_ref();
        let conversion = sqlx::query_as::<_, Conversion>(
            r#"
            SELECT id, filename, original_filename, status, created_at, audio_file, text_length
            FROM conversions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(conversion)
    }

    /// Artifact filename for a job, only if it completed.
    pub async fn find_completed_audio(&self, id: Uuid) -> AppResult<Option<String>> {
        let pool = self.pool.as_ref();
        let audio_file = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT audio_file
            FROM conversions
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(ConversionStatus::Completed)
        .fetch_optional(pool)
        .await?;

        Ok(audio_file.flatten())
    }

    /// Most recent conversions, newest first.
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<ConversionSummary>> {
        let pool = self.pool.as_ref();
        let summaries = sqlx::query_as::<_, ConversionSummary>(
            r#"
            SELECT id, original_filename, status, created_at, text_length
            FROM conversions
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(summaries)
    }
}
