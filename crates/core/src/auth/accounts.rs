use crate::auth::TokenEndpoint;
use crate::config::Settings;
use crate::domain::token::TokenGrant;
use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Spotify accounts service: authorize URL and the token endpoint.
#[derive(Debug, Clone)]
pub struct SpotifyAccounts {
    http: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl SpotifyAccounts {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client_id = settings.require_spotify_client_id()?.to_string();
        let client_secret = settings.require_spotify_client_secret()?.to_string();
        let redirect_uri = settings.require_spotify_redirect_uri()?.to_string();

        let accounts_url = std::env::var("SPOTIFY_ACCOUNTS_URL")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build Spotify accounts http client")?;

        Ok(Self {
            http,
            accounts_url,
            client_id,
            client_secret,
            redirect_uri,
            scope: settings.spotify_scope.clone(),
        })
    }

    pub fn authorize_url(&self, state: Option<&str>) -> Result<String> {
        let base = format!("{}/authorize", self.accounts_url.trim_end_matches('/'));
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", self.scope.as_str()),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }
        let url = reqwest::Url::parse_with_params(&base, &params)
            .with_context(|| format!("invalid Spotify accounts URL: {base}"))?;
        Ok(url.to_string())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant> {
        let url = format!("{}/api/token", self.accounts_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .context("Spotify token request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Spotify token response")?;
        if !status.is_success() {
            anyhow::bail!("Spotify token HTTP {status}: {text}");
        }

        serde_json::from_str::<TokenGrant>(&text).context("failed to parse Spotify token response")
    }
}

#[async_trait::async_trait]
impl TokenEndpoint for SpotifyAccounts {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_encodes_scope_and_redirect() {
        let settings = Settings {
            database_url: None,
            sentry_dsn: None,
            tmdb_api_key: None,
            spotify_client_id: Some("cid".to_string()),
            spotify_client_secret: Some("secret".to_string()),
            spotify_redirect_uri: Some("http://localhost:3000/auth/callback".to_string()),
            spotify_scope: "user-top-read user-read-private".to_string(),
            api_access_token: None,
        };
        let accounts = SpotifyAccounts::from_settings(&settings).unwrap();
        let url = accounts.authorize_url(Some("xyz")).unwrap();
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
        assert!(url.contains("scope=user-top-read+user-read-private"));
        assert!(url.ends_with("state=xyz"));
        assert!(!url.contains("secret"));
    }

    #[test]
    fn token_grant_parses_optional_fields() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","token_type":"Bearer","expires_in":3600}"#)
                .unwrap();
        assert_eq!(grant.refresh_token, None);
        assert_eq!(grant.expires_in, Some(3600));
    }
}
