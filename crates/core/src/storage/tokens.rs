use crate::auth::TokenStore;
use crate::domain::token::AuthToken;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// `spotify_tokens` table, one row per account.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: sqlx::PgPool,
}

impl PgTokenStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

type TokenRow = (String, String, Option<String>, i64, DateTime<Utc>, String);

#[async_trait::async_trait]
impl TokenStore for PgTokenStore {
    async fn load(&self, account_id: &str) -> Result<Option<AuthToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT account_id, access_token, refresh_token, expires_in, expires_at, token_type \
             FROM spotify_tokens \
             WHERE account_id = $1",
        )
        .persistent(false)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .context("select spotify_tokens failed")?;

        Ok(row.map(
            |(account_id, access_token, refresh_token, expires_in, expires_at, token_type)| AuthToken {
                account_id,
                access_token,
                refresh_token,
                expires_in,
                expires_at,
                token_type,
            },
        ))
    }

    async fn save(&self, token: &AuthToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO spotify_tokens (account_id, access_token, refresh_token, expires_in, expires_at, token_type, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             ON CONFLICT (account_id) DO UPDATE SET \
               access_token = EXCLUDED.access_token, \
               refresh_token = COALESCE(EXCLUDED.refresh_token, spotify_tokens.refresh_token), \
               expires_in = EXCLUDED.expires_in, \
               expires_at = EXCLUDED.expires_at, \
               token_type = EXCLUDED.token_type, \
               updated_at = now()",
        )
        .persistent(false)
        .bind(&token.account_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_in)
        .bind(token.expires_at)
        .bind(&token.token_type)
        .execute(&self.pool)
        .await
        .context("upsert spotify_tokens failed")?;
        Ok(())
    }
}
