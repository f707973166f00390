//! SQLite-backed [`TranscriptStore`] implementation.
//!
//! One table, `transcript_lines`, holds every lecture's lines (see
//! [`migrate`](crate::migrate)). A replace runs as DELETE + INSERTs inside a
//! single transaction, so readers see either the old set or the new one.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use lecture_transcripts_core::store::TranscriptStore;
use lecture_transcripts_core::{
    LectureKey, LineId, LineTiming, NewTranscriptLine, Result, TranscriptError, TranscriptLine,
};

/// SQLite implementation of the [`TranscriptStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage(e: sqlx::Error) -> TranscriptError {
    TranscriptError::StorageUnavailable(e.to_string())
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        TranscriptError::StorageUnavailable(format!("{} does not fit an INTEGER column", value))
    })
}

fn from_sql_int(column: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        TranscriptError::StorageUnavailable(format!("stored {} is negative: {}", column, value))
    })
}

#[async_trait]
impl TranscriptStore for SqliteStore {
    async fn replace_all(
        &self,
        lecture: &LectureKey,
        lines: &[NewTranscriptLine],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let removed = sqlx::query("DELETE FROM transcript_lines WHERE lecture_key = ?")
            .bind(lecture.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();

        for line in lines {
            sqlx::query(
                "INSERT INTO transcript_lines (lecture_key, start_ms, duration_ms, content) VALUES (?, ?, ?, ?)",
            )
            .bind(lecture.as_str())
            .bind(to_sql_int(line.timing.start_ms())?)
            .bind(to_sql_int(line.timing.duration_ms())?)
            .bind(&line.content)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        tracing::debug!(lecture = %lecture, removed, inserted = lines.len(), "replaced transcript");
        Ok(lines.len())
    }

    async fn find_by_lecture(&self, lecture: &LectureKey) -> Result<Vec<TranscriptLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, start_ms, duration_ms, content
            FROM transcript_lines
            WHERE lecture_key = ?
            ORDER BY start_ms ASC, id ASC
            "#,
        )
        .bind(lecture.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(storage)?;
                let start: i64 = row.try_get("start_ms").map_err(storage)?;
                let duration: i64 = row.try_get("duration_ms").map_err(storage)?;
                let content: String = row.try_get("content").map_err(storage)?;

                let timing = LineTiming::new(
                    from_sql_int("start_ms", start)?,
                    from_sql_int("duration_ms", duration)?,
                )
                .map_err(|e| {
                    TranscriptError::StorageUnavailable(format!("stored line {}: {}", id, e))
                })?;

                Ok(TranscriptLine {
                    id: LineId(id),
                    lecture_key: lecture.clone(),
                    timing,
                    content,
                })
            })
            .collect()
    }

    async fn delete_all_for_lecture(&self, lecture: &LectureKey) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transcript_lines WHERE lecture_key = ?")
            .bind(lecture.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected())
    }
}
