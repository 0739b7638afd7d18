use anyhow::Context;
use clap::{Parser, Subcommand};
use marquee_core::auth::error::AuthError;
use marquee_core::pipeline::PipelineConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod movies;

#[derive(Debug, Parser)]
#[command(name = "marquee_worker")]
struct Args {
    /// Directory for the CSV and report files. Overrides PIPELINE_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sample candidates from TMDB discover, enrich them with detail and write the raw CSV.
    Collect {
        /// Stop collecting once this many unique candidates are found.
        #[arg(long)]
        max_candidates: Option<usize>,
    },
    /// Clean the raw CSV, derive ROI and success status, write the cleaned CSV.
    Preprocess,
    /// Build the genre/country report from the cleaned CSV.
    Aggregate,
    /// Collect, preprocess and aggregate in one go.
    Run {
        #[arg(long)]
        max_candidates: Option<usize>,
    },
    /// Refresh one account's Spotify top tracks.
    SyncTracks {
        #[arg(long)]
        account_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = marquee_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let result = match args.command {
        Command::Collect { max_candidates } => {
            if max_candidates.is_some() {
                config.collector.max_candidates = max_candidates;
            }
            movies::collect(&settings, &config).await
        }
        Command::Preprocess => movies::preprocess(&config),
        Command::Aggregate => movies::aggregate(&config),
        Command::Run { max_candidates } => {
            if max_candidates.is_some() {
                config.collector.max_candidates = max_candidates;
            }
            movies::run_all(&settings, &config).await
        }
        Command::SyncTracks { account_id } => sync_tracks(&settings, &account_id).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn sync_tracks(settings: &marquee_core::config::Settings, account_id: &str) -> anyhow::Result<()> {
    use marquee_core::auth::accounts::SpotifyAccounts;
    use marquee_core::auth::lifecycle::TokenManager;
    use marquee_core::spotify::client::SpotifyApi;
    use marquee_core::spotify::sync::SyncOptions;
    use marquee_core::storage::tokens::PgTokenStore;
    use std::sync::Arc;

    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    marquee_core::storage::migrate(&pool).await?;

    let tokens = TokenManager::new(
        Arc::new(PgTokenStore::new(pool.clone())),
        Arc::new(SpotifyAccounts::from_settings(settings)?),
        SpotifyApi::from_env()?,
    );

    match marquee_core::spotify::account::sync_account(&pool, &tokens, account_id, &SyncOptions::from_env()).await {
        Ok(summary) => {
            tracing::info!(
                account_id,
                run_id = %summary.run_id,
                fetched = summary.fetched,
                stored = summary.stored,
                skipped = summary.skipped,
                failed_batches = summary.failed_batches,
                "top tracks sync finished"
            );
            Ok(())
        }
        Err(err) => match err.downcast_ref::<AuthError>() {
            Some(auth) if auth.requires_login() => {
                tracing::warn!(account_id, error = %auth, "account must log in again through the API /auth/login");
                Err(err)
            }
            _ => Err(err),
        },
    }
}

fn init_sentry(settings: &marquee_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
