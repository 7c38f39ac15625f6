//! Access token cache for Firestore authentication.
//!
//! Tokens are refreshed a minute before they expire. A single mutex guards
//! the slot, so concurrent callers wait for one refresh instead of each
//! hitting the token endpoint. If a refresh fails while the old token is
//! still inside its lifetime, the old token is returned.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gcp_auth::TokenProvider;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// OAuth scope for Firestore REST access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

fn refresh_margin() -> Duration {
    Duration::seconds(60)
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + refresh_margin() < self.expires_at
    }

    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Shared, refreshing token source.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            slot: Mutex::new(None),
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    /// Return a token that is valid for at least the refresh margin.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        let mut slot = self.slot.lock().await;
        let now = Utc::now();

        if let Some(cached) = slot.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(cached.value.clone());
        }

        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let cached = CachedToken {
                    value: token.as_str().to_string(),
                    expires_at: token.expires_at(),
                };
                debug!(expires_at = %cached.expires_at, "Refreshed Firestore auth token");
                let value = cached.value.clone();
                *slot = Some(cached);
                Ok(value)
            }
            Err(e) => match slot.as_ref().filter(|t| t.is_usable(now)) {
                Some(stale) => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(stale.value.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(seconds: i64, now: DateTime<Utc>) -> CachedToken {
        CachedToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(seconds),
        }
    }

    #[test]
    fn test_token_inside_margin_needs_refresh_but_is_usable() {
        let now = Utc::now();
        let token = token_expiring_in(30, now);
        assert!(!token.is_fresh(now));
        assert!(token.is_usable(now));
    }

    #[test]
    fn test_expired_token_is_unusable() {
        let now = Utc::now();
        let token = token_expiring_in(-1, now);
        assert!(!token.is_usable(now));
        assert!(token_expiring_in(3600, now).is_fresh(now));
    }

    #[test]
    fn test_firestore_scope() {
        assert!(FIRESTORE_SCOPE.contains("datastore"));
    }
}
