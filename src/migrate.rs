use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Open the configured database and bring its schema up to date.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the transcript schema on `pool`. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT keeps ids growing across deletes, so id order is
    // insertion order even after a lecture is re-imported.
    // end_ms is generated from its inputs and can never disagree with them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcript_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lecture_key TEXT NOT NULL,
            start_ms INTEGER NOT NULL CHECK (start_ms >= 0),
            duration_ms INTEGER NOT NULL CHECK (duration_ms >= 0),
            end_ms INTEGER GENERATED ALWAYS AS (start_ms + duration_ms) VIRTUAL,
            content TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transcript_lines_lecture ON transcript_lines(lecture_key, start_ms, id)",
    )
    .execute(pool)
    .await?;

    tracing::debug!("transcript schema applied");
    Ok(())
}
