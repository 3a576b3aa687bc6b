//! Service layer for the queue-display service
//!
//! This module contains the main application state, health checks and the
//! HTTP server exposing the queue API.

pub mod app;
pub mod health;
pub mod server;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use server::{create_router, HttpServer, HttpServerConfig};
