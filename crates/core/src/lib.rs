pub mod auth;
pub mod dataset;
pub mod domain;
pub mod ingest;
pub mod pipeline;
pub mod spotify;
pub mod storage;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub tmdb_api_key: Option<String>,
        pub spotify_client_id: Option<String>,
        pub spotify_client_secret: Option<String>,
        pub spotify_redirect_uri: Option<String>,
        pub spotify_scope: String,
        /// Shared bearer token for the account routes. Unset means the API trusts its network.
        pub api_access_token: Option<String>,
    }

    const DEFAULT_SPOTIFY_SCOPE: &str = "user-top-read user-read-private user-read-email";

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                tmdb_api_key: std::env::var("TMDB_API_KEY").ok(),
                spotify_client_id: std::env::var("SPOTIFY_CLIENT_ID").ok(),
                spotify_client_secret: std::env::var("SPOTIFY_CLIENT_SECRET").ok(),
                spotify_redirect_uri: std::env::var("SPOTIFY_REDIRECT_URI").ok(),
                spotify_scope: std::env::var("SPOTIFY_SCOPE")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.to_string()),
                api_access_token: std::env::var("API_ACCESS_TOKEN")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_tmdb_api_key(&self) -> anyhow::Result<&str> {
            self.tmdb_api_key
                .as_deref()
                .context("TMDB_API_KEY is required")
        }

        pub fn require_spotify_client_id(&self) -> anyhow::Result<&str> {
            self.spotify_client_id
                .as_deref()
                .context("SPOTIFY_CLIENT_ID is required")
        }

        pub fn require_spotify_client_secret(&self) -> anyhow::Result<&str> {
            self.spotify_client_secret
                .as_deref()
                .context("SPOTIFY_CLIENT_SECRET is required")
        }

        pub fn require_spotify_redirect_uri(&self) -> anyhow::Result<&str> {
            self.spotify_redirect_uri
                .as_deref()
                .context("SPOTIFY_REDIRECT_URI is required")
        }
    }
}

/// Parse an env var into `T`, falling back to `default` when unset or unparsable.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}
