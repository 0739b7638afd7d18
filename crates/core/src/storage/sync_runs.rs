use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Audit row for one batch run (`collect`, `sync-tracks`, ...).
pub async fn record_sync_run(
    pool: &sqlx::PgPool,
    job: &str,
    account_id: Option<&str>,
    status: &str,
    summary: serde_json::Value,
    error: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let finished_at: DateTime<Utc> = Utc::now();

    sqlx::query(
        "INSERT INTO sync_runs (id, job, account_id, finished_at, status, summary, error) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .persistent(false)
    .bind(id)
    .bind(job)
    .bind(account_id)
    .bind(finished_at)
    .bind(status)
    .bind(summary)
    .bind(error)
    .execute(pool)
    .await
    .context("insert sync_runs failed")?;

    Ok(id)
}
