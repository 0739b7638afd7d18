use crate::auth::error::AuthError;
use crate::auth::{TokenEndpoint, TokenStore};
use crate::domain::token::{AuthToken, TokenGrant};
use crate::spotify::client::{SpotifyApi, SpotifyClient};
use crate::spotify::MusicApi;
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

/// Loads, refreshes and persists per-account tokens.
///
/// Expired tokens are refreshed at most once per call and never served stale. Refreshes for
/// the same account are serialized, so concurrent requests observe the refreshed token
/// instead of spending the refresh token twice.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    api: SpotifyApi,
    account_locks: AccountLocks,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, endpoint: Arc<dyn TokenEndpoint>, api: SpotifyApi) -> Self {
        Self {
            store,
            endpoint,
            api,
            account_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Serializes work on one account. The map entry is dropped again once the last
    /// holder releases it, so unknown or one-off accounts leave nothing behind.
    async fn lock_account(&self, account_id: &str) -> AccountLease<'_> {
        let lock = {
            let mut locks = self
                .account_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(account_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        AccountLease {
            locks: &self.account_locks,
            account_id: account_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    pub async fn valid_token(&self, account_id: &str) -> Result<AuthToken, AuthError> {
        let _lease = self.lock_account(account_id).await;

        let Some(mut token) = self.store.load(account_id).await? else {
            return Err(AuthError::TokenNotFound {
                account_id: account_id.to_string(),
            });
        };

        if !token.is_expired(Utc::now()) {
            return Ok(token);
        }

        let Some(refresh_token) = token.refresh_token.clone().filter(|s| !s.is_empty()) else {
            return Err(AuthError::ReauthRequired {
                account_id: account_id.to_string(),
                reason: "access token expired and no refresh token is stored".to_string(),
            });
        };

        tracing::info!(account_id, expired_at = %token.expires_at, "access token expired; refreshing");
        let grant = match self.endpoint.refresh(&refresh_token).await {
            Ok(grant) => grant,
            Err(err) => {
                tracing::warn!(account_id, error = %err, "token refresh failed");
                return Err(AuthError::ReauthRequired {
                    account_id: account_id.to_string(),
                    reason: format!("{err:#}"),
                });
            }
        };

        token.apply_refresh(grant, Utc::now());
        self.store.save(&token).await?;
        tracing::info!(account_id, expires_at = %token.expires_at, "access token refreshed");
        Ok(token)
    }

    pub async fn get_valid_client(&self, account_id: &str) -> Result<SpotifyClient, AuthError> {
        let token = self.valid_token(account_id).await?;
        Ok(self.api.with_token(&token))
    }

    /// Persist a fresh authorization-code grant for `account_id`.
    pub async fn store_grant(&self, account_id: &str, grant: TokenGrant) -> Result<AuthToken, AuthError> {
        let _lease = self.lock_account(account_id).await;

        let token = AuthToken::from_grant(account_id, grant, Utc::now());
        self.store.save(&token).await?;
        Ok(token)
    }

    /// Finish the OAuth callback: exchange the code, resolve the account through the
    /// profile endpoint, store the token.
    pub async fn complete_login(&self, code: &str) -> anyhow::Result<AuthToken> {
        let grant = self
            .endpoint
            .exchange_code(code)
            .await
            .context("authorization code exchange failed")?;

        let profile = self
            .api
            .with_access_token(&grant.access_token)
            .me()
            .await
            .context("failed to resolve account for new token")?;

        let token = self.store_grant(&profile.id, grant).await?;
        tracing::info!(account_id = %token.account_id, "stored token from authorization code");
        Ok(token)
    }
}

type AccountLocks = std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

struct AccountLease<'a> {
    locks: &'a AccountLocks,
    account_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for AccountLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is holding or waiting.
        let idle = locks
            .get(&self.account_id)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(&self.lock) == 2);
        if idle {
            locks.remove(&self.account_id);
        }
    }
}
