#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token stored for account {account_id}")]
    TokenNotFound { account_id: String },

    #[error("re-authentication required for account {account_id}: {reason}")]
    ReauthRequired { account_id: String, reason: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    /// True when the caller has to send the user back through the authorization flow.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::TokenNotFound { .. } | Self::ReauthRequired { .. })
    }
}
