use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_core::auth::accounts::SpotifyAccounts;
use marquee_core::auth::error::AuthError;
use marquee_core::auth::lifecycle::TokenManager;
use marquee_core::domain::track::PopularityBucket;
use marquee_core::spotify::account::{sync_account, SyncSummary};
use marquee_core::spotify::client::SpotifyApi;
use marquee_core::spotify::summary::{listening_summary, popularity_within, ListeningSummary, DEFAULT_RANKING_LIMIT};
use marquee_core::spotify::sync::SyncOptions;
use marquee_core::storage::tokens::PgTokenStore;
use marquee_core::storage::tracks::load_ranked_tracks;

const LOGIN_PATH: &str = "/auth/login";

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
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match marquee_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let accounts = match SpotifyAccounts::from_settings(&settings) {
        Ok(accounts) => Some(Arc::new(accounts)),
        Err(e) => {
            tracing::error!(error = %e, "Spotify credentials missing; auth routes disabled");
            None
        }
    };

    let tokens = match (&pool, &accounts) {
        (Some(pool), Some(accounts)) => Some(Arc::new(TokenManager::new(
            Arc::new(PgTokenStore::new(pool.clone())),
            accounts.clone(),
            SpotifyApi::from_env()?,
        ))),
        _ => None,
    };

    if settings.api_access_token.is_none() {
        tracing::warn!("API_ACCESS_TOKEN not set; account routes are open to any caller");
    }

    let state = AppState {
        pool,
        accounts,
        tokens,
        sync: SyncOptions::from_env(),
        access_token: settings.api_access_token.clone().map(Arc::from),
    };

    let account_routes = Router::new()
        .route("/accounts/:account_id/sync", post(sync_account_tracks))
        .route("/accounts/:account_id/summary", get(get_summary))
        .route("/accounts/:account_id/popularity", get(get_popularity))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access_token));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route(LOGIN_PATH, get(login))
        .route("/auth/callback", get(callback))
        .merge(account_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    accounts: Option<Arc<SpotifyAccounts>>,
    tokens: Option<Arc<TokenManager>>,
    sync: SyncOptions,
    access_token: Option<Arc<str>>,
}

fn bearer_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

async fn require_access_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !bearer_matches(state.access_token.as_deref(), req.headers()) {
        tracing::warn!(path = %req.uri().path(), "rejected account request without valid access token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

enum ApiError {
    Status(StatusCode),
    Login,
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::Status(status)
    }
}

impl ApiError {
    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "request failed");
        Self::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Auth failures that need a fresh login redirect; everything else is a server error.
    fn from_sync(err: anyhow::Error) -> Self {
        match err.downcast_ref::<AuthError>() {
            Some(auth) if auth.requires_login() => {
                tracing::info!(error = %auth, "redirecting to login");
                Self::Login
            }
            _ => Self::internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Status(status) => status.into_response(),
            Self::Login => Redirect::to(LOGIN_PATH).into_response(),
        }
    }
}

async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let accounts = state.accounts.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    let url = accounts.authorize_url(None).map_err(ApiError::internal)?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    account_id: String,
    sync: SyncSummary,
}

async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let (Some(pool), Some(tokens)) = (&state.pool, &state.tokens) else {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into());
    };
    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error, "authorization denied by user or provider");
        return Err(StatusCode::BAD_REQUEST.into());
    }
    let code = params.code.as_deref().ok_or(StatusCode::BAD_REQUEST)?;

    let token = tokens.complete_login(code).await.map_err(|e| {
        tracing::warn!(error = %e, "login callback failed");
        ApiError::Status(StatusCode::BAD_GATEWAY)
    })?;

    let sync = sync_account(pool, tokens, &token.account_id, &state.sync)
        .await
        .map_err(ApiError::from_sync)?;

    Ok(Json(CallbackResponse {
        account_id: token.account_id,
        sync,
    }))
}

async fn sync_account_tracks(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<SyncSummary>, ApiError> {
    let (Some(pool), Some(tokens)) = (&state.pool, &state.tokens) else {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into());
    };

    let summary = sync_account(pool, tokens, &account_id, &state.sync)
        .await
        .map_err(ApiError::from_sync)?;
    Ok(Json(summary))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<ListeningSummary>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into());
    };

    let tracks = load_ranked_tracks(pool, &account_id, None)
        .await
        .map_err(ApiError::internal)?;
    if tracks.is_empty() {
        return Err(StatusCode::NOT_FOUND.into());
    }
    Ok(Json(listening_summary(tracks)))
}

#[derive(Debug, Deserialize)]
struct PopularityParams {
    limit: Option<i32>,
}

#[derive(Debug, Serialize)]
struct PopularityResponse {
    limit: i32,
    popularity_data: Vec<PopularityBucket>,
}

async fn get_popularity(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(params): Query<PopularityParams>,
) -> Result<Json<PopularityResponse>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into());
    };

    let limit = params.limit.unwrap_or(DEFAULT_RANKING_LIMIT);
    if limit < 1 {
        return Err(StatusCode::BAD_REQUEST.into());
    }

    let tracks = load_ranked_tracks(pool, &account_id, Some(limit))
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(PopularityResponse {
        limit,
        popularity_data: popularity_within(&tracks, limit),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
