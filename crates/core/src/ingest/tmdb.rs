use crate::config::Settings;
use crate::domain::movie::MovieDetail;
use crate::env_or;
use crate::ingest::pace::Pacer;
use crate::ingest::provider::{DiscoverQuery, MovieCatalog};
use crate::ingest::types::{DiscoverMovie, DiscoverResponse, MovieDetailResponse};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "ko-KR";
// Older releases distort money values too much to compare.
const DEFAULT_MIN_RELEASE_DATE: &str = "2000-01-01";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQ_DELAY_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct TmdbOptions {
    pub base_url: String,
    pub language: String,
    pub min_release_date: String,
    pub timeout: Duration,
    /// Minimum gap between consecutive TMDB calls.
    pub request_delay: Duration,
}

impl Default for TmdbOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            min_release_date: DEFAULT_MIN_RELEASE_DATE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_delay: Duration::from_millis(DEFAULT_REQ_DELAY_MS),
        }
    }
}

impl TmdbOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("TMDB_BASE_URL").unwrap_or(defaults.base_url),
            language: std::env::var("TMDB_LANGUAGE").unwrap_or(defaults.language),
            min_release_date: std::env::var("TMDB_MIN_RELEASE_DATE")
                .unwrap_or(defaults.min_release_date),
            timeout: Duration::from_secs(env_or("TMDB_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            request_delay: Duration::from_millis(env_or("TMDB_REQ_DELAY_MS", DEFAULT_REQ_DELAY_MS)),
        }
    }
}

#[derive(Debug)]
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    opts: TmdbOptions,
    pacer: Pacer,
}

impl TmdbClient {
    pub fn from_settings(settings: &Settings, opts: TmdbOptions) -> Result<Self> {
        let api_key = settings.require_tmdb_api_key()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(opts.timeout)
            .build()
            .context("failed to build TMDB http client")?;

        Ok(Self {
            http,
            api_key,
            pacer: Pacer::new(opts.request_delay),
            opts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.opts.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        let res = self
            .pacer
            .run(async {
                let res = self
                    .http
                    .get(url)
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("language", self.opts.language.as_str()),
                    ])
                    .query(params)
                    .send()
                    .await
                    .context("TMDB request failed")?;

                let status = res.status();
                let text = res
                    .text()
                    .await
                    .context("failed to read TMDB response")?;
                anyhow::Ok((status, text))
            })
            .await;

        let (status, text) = res?;
        if !status.is_success() {
            anyhow::bail!("TMDB {path} HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse TMDB {path} response"))
    }
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbClient {
    fn provider_name(&self) -> &'static str {
        "tmdb"
    }

    async fn discover_page(&self, query: &DiscoverQuery) -> Result<Vec<DiscoverMovie>> {
        let params = [
            ("sort_by", query.sort_by.to_string()),
            ("include_adult", "false".to_string()),
            ("vote_count.gte", query.min_votes.to_string()),
            ("primary_release_date.gte", self.opts.min_release_date.clone()),
            ("page", query.page.to_string()),
        ];
        let resp: DiscoverResponse = self.get_json("/discover/movie", &params).await?;
        Ok(resp.results)
    }

    async fn movie_detail(&self, id: i64) -> Result<MovieDetail> {
        let resp: MovieDetailResponse = self.get_json(&format!("/movie/{id}"), &[]).await?;
        anyhow::ensure!(
            resp.id == id,
            "TMDB detail id mismatch: expected {id}, got {}",
            resp.id
        );
        Ok(resp.into())
    }
}
