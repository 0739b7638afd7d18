use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Bearer/refresh token pair persisted per external account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

/// Token endpoint response, shared by the code exchange and the refresh grant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl AuthToken {
    pub fn from_grant(account_id: &str, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let expires_in = grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            account_id: account_id.to_string(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in,
            expires_at: now + Duration::seconds(expires_in),
            token_type: grant.token_type,
        }
    }

    /// Valid only while `expires_at` is strictly in the future.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Apply a refresh grant in place. The account id never changes and the refresh
    /// token is only replaced when the provider rotated it.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        let expires_in = grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.access_token = grant.access_token;
        self.expires_in = expires_in;
        self.expires_at = now + Duration::seconds(expires_in);
        self.token_type = grant.token_type;
        if let Some(rt) = grant.refresh_token.filter(|s| !s.is_empty()) {
            self.refresh_token = Some(rt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expires_at: DateTime<Utc>) -> AuthToken {
        AuthToken {
            account_id: "acct".to_string(),
            access_token: "old".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_in: 3600,
            expires_at,
            token_type: "Bearer".to_string(),
        }
    }

    #[test]
    fn expiry_is_inclusive_of_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(token(now).is_expired(now));
        assert!(token(now - Duration::seconds(1)).is_expired(now));
        assert!(!token(now + Duration::seconds(1)).is_expired(now));
    }

    #[test]
    fn refresh_keeps_refresh_token_when_not_rotated() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut tok = token(now);
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"new","expires_in":1800,"token_type":"Bearer"}"#,
        )
        .unwrap();
        tok.apply_refresh(grant, now);
        assert_eq!(tok.access_token, "new");
        assert_eq!(tok.refresh_token.as_deref(), Some("r1"));
        assert_eq!(tok.expires_in, 1800);
        assert_eq!(tok.expires_at, now + Duration::seconds(1800));
        assert_eq!(tok.account_id, "acct");
    }

    #[test]
    fn refresh_replaces_rotated_refresh_token() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut tok = token(now);
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"new","refresh_token":"r2","token_type":"Bearer"}"#,
        )
        .unwrap();
        tok.apply_refresh(grant, now);
        assert_eq!(tok.refresh_token.as_deref(), Some("r2"));
        // Missing expires_in falls back to one hour.
        assert_eq!(tok.expires_at, now + Duration::seconds(3600));
    }
}
