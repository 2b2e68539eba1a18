//! services/api/src/web/session.rs
//!
//! In-process session store mapping opaque cookie tokens to user ids.
//!
//! Sessions live for a fixed 24 hours from issuance and survive only for
//! the process lifetime. The api binary prunes expired entries on an
//! interval; `validate` also drops an expired entry when it is touched.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Cookie name carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Fixed session lifetime in seconds (24 hours), also used for the
/// cookie's Max-Age.
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

/// A shared, cloneable handle to the session map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(SESSION_TTL_SECONDS),
        }
    }

    #[cfg(test)]
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issues a fresh opaque token for the user. The expiry is fixed at
    /// issuance; it does not slide on use.
    pub async fn issue(&self, user_id: i64) -> String {
        let token = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            user_id,
            expires_at: Utc::now() + self.ttl,
        };
        self.inner.lock().await.insert(token.clone(), entry);
        token
    }

    /// Resolves a token to its user id. Expired entries are removed on
    /// touch and reported as absent.
    pub async fn validate(&self, token: &str) -> Option<i64> {
        let mut sessions = self.inner.lock().await;
        match sessions.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.user_id),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Drops a session. Returns whether a session existed for the token.
    pub async fn revoke(&self, token: &str) -> bool {
        self.inner.lock().await.remove(token).is_some()
    }

    /// Removes all expired entries, returning how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.inner.lock().await;
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the session token from the `Cookie` request header.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix("session=")
    })
}
