//! Operator authentication and sessions
//!
//! This module gates access to queue mutations. Operators sign in with an
//! email and password and receive a bearer token for subsequent requests.

use crate::clock::Clock;
use crate::error::{QueueError, Result};
use crate::utils::generate_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// An authenticated operator session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Trait for operator authentication services
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Look up a live session by token
    async fn get_session(&self, token: &str) -> Result<Option<Session>>;

    /// Check credentials and open a session; `None` on bad credentials
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Option<Session>>;

    /// Close a session; returns whether it existed
    async fn sign_out(&self, token: &str) -> Result<bool>;
}

/// Authenticator with a fixed set of operator credentials and in-memory sessions
pub struct StaticAuthenticator {
    credentials: HashMap<String, String>,
    sessions: RwLock<HashMap<String, Session>>,
    session_ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl StaticAuthenticator {
    /// Create a new authenticator for the given email/password pairs
    pub fn new(
        credentials: HashMap<String, String>,
        session_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session_ttl =
            chrono::Duration::from_std(session_ttl).unwrap_or_else(|_| chrono::Duration::hours(8));

        Self {
            credentials,
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
            clock,
        }
    }

    /// Authenticator with no operators; every sign-in fails
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self::new(HashMap::new(), Duration::from_secs(1), clock)
    }

    /// Number of sessions currently held (including expired, not yet pruned)
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn credentials_match(&self, email: &str, password: &str) -> bool {
        self.credentials
            .get(&email.to_lowercase())
            .map_or(false, |expected| constant_time_eq(expected.as_bytes(), password.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(token) {
            Some(session) if session.expires_at > now => return Ok(Some(session.clone())),
            Some(session) => {
                debug!("Session for {} expired at {}", session.email, session.expires_at);
                true
            }
            None => false,
        };

        if expired {
            sessions.remove(token);
        }
        Ok(None)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Option<Session>> {
        if !self.credentials_match(email, password) {
            warn!("Operator sign-in failed for {}", email);
            return Ok(None);
        }

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.session_ttl).ok_or_else(|| {
            QueueError::AuthenticationFailed {
                reason: format!("session lifetime {} is out of range", self.session_ttl),
            }
        })?;
        let session = Session {
            token: generate_id(),
            email: email.to_lowercase(),
            created_at: now,
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.token.clone(), session.clone());

        info!("Operator {} signed in", session.email);
        Ok(Some(session))
    }

    async fn sign_out(&self, token: &str) -> Result<bool> {
        let removed = self.sessions.write().await.remove(token);
        if let Some(session) = &removed {
            info!("Operator {} signed out", session.email);
        }
        Ok(removed.is_some())
    }
}

/// Mock authenticator for testing
pub struct MockAuthenticator {
    always_allow: bool,
    sessions: std::sync::Mutex<HashMap<String, Session>>,
}

impl MockAuthenticator {
    /// Create a mock authenticator that accepts any credentials
    pub fn allow_all() -> Self {
        Self {
            always_allow: true,
            sessions: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Create a mock authenticator that rejects all credentials
    pub fn deny_all() -> Self {
        Self {
            always_allow: false,
            sessions: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(token).cloned()))
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Option<Session>> {
        if !self.always_allow {
            return Ok(None);
        }

        let now = crate::utils::current_timestamp();
        let session = Session {
            token: generate_id(),
            email: email.to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session.token.clone(), session.clone());
        }
        Ok(Some(session))
    }

    async fn sign_out(&self, token: &str) -> Result<bool> {
        Ok(self
            .sessions
            .lock()
            .map(|mut sessions| sessions.remove(token).is_some())
            .unwrap_or(false))
    }
}
