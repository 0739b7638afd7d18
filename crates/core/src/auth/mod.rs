pub mod accounts;
pub mod error;
pub mod lifecycle;

use crate::domain::token::{AuthToken, TokenGrant};
use anyhow::Result;

/// Persistence for per-account tokens.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, account_id: &str) -> Result<Option<AuthToken>>;

    /// Insert or overwrite the account's row as a single atomic write.
    async fn save(&self, token: &AuthToken) -> Result<()>;
}

/// OAuth token endpoint of the external account provider.
#[async_trait::async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}
