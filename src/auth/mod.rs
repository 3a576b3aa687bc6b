//! Operator authentication
//!
//! Sessions gate every queue mutation exposed over HTTP.

pub mod session;

pub use session::{Authenticator, MockAuthenticator, Session, StaticAuthenticator};

use crate::clock::Clock;
use crate::config::AuthSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Build the authenticator described by `settings`
pub fn from_settings(settings: &AuthSettings, clock: Arc<dyn Clock>) -> StaticAuthenticator {
    match (&settings.operator_email, &settings.operator_password) {
        (Some(email), Some(password)) => {
            let mut credentials = HashMap::new();
            credentials.insert(email.to_lowercase(), password.clone());
            StaticAuthenticator::new(credentials, settings.session_ttl(), clock)
        }
        _ => {
            warn!("No operator credentials configured - queue mutations are disabled");
            StaticAuthenticator::disabled(clock)
        }
    }
}
