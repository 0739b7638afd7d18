use crate::auth::lifecycle::TokenManager;
use crate::spotify::sync::{sync_top_tracks, SyncOptions};
use crate::storage::{sync_runs, tracks};
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub const SYNC_JOB: &str = "sync-tracks";

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub account_id: String,
    pub fetched: usize,
    pub stored: u64,
    pub skipped: usize,
    pub artists: usize,
    pub failed_batches: usize,
}

/// Refresh the account's token if needed, pull its top tracks and replace the stored set.
///
/// Auth failures come back as [`crate::auth::error::AuthError`] inside the `anyhow::Error`;
/// callers downcast to decide whether to send the user back to login. Every attempt that
/// gets past auth leaves a `sync_runs` row.
pub async fn sync_account(
    pool: &sqlx::PgPool,
    tokens: &TokenManager,
    account_id: &str,
    opts: &SyncOptions,
) -> anyhow::Result<SyncSummary> {
    let client = tokens.get_valid_client(account_id).await?;

    let result = async {
        let sync = sync_top_tracks(&client, opts).await?;
        let stored = tracks::replace_top_tracks(pool, account_id, &sync.artists, &sync.tracks)
            .await
            .context("persist top tracks failed")?;
        anyhow::Ok((sync, stored))
    }
    .await;

    match result {
        Ok((sync, stored)) => {
            let summary = json!({
                "fetched": sync.fetched,
                "stored": stored,
                "skipped": sync.skipped,
                "artists": sync.artists.len(),
                "failed_batches": sync.failed_batches,
            });
            let run_id =
                sync_runs::record_sync_run(pool, SYNC_JOB, Some(account_id), "success", summary, None)
                    .await?;
            tracing::info!(account_id, %run_id, stored, "account sync persisted");
            Ok(SyncSummary {
                run_id,
                account_id: account_id.to_string(),
                fetched: sync.fetched,
                stored,
                skipped: sync.skipped,
                artists: sync.artists.len(),
                failed_batches: sync.failed_batches,
            })
        }
        Err(err) => {
            let message = format!("{err:#}");
            if let Err(record_err) = sync_runs::record_sync_run(
                pool,
                SYNC_JOB,
                Some(account_id),
                "error",
                json!({}),
                Some(&message),
            )
            .await
            {
                tracing::warn!(account_id, error = %record_err, "failed to record failed sync run");
            }
            Err(err)
        }
    }
}
