//! Error types for the queue display service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue scenarios
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to fetch queue state: {message}")]
    FetchFailed { message: String },

    #[error("Failed to update queue: {message}")]
    MutationFailed { message: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
