//! Backing store for the queue state and its history log
//!
//! This module defines the store interface and its in-memory and REST
//! implementations, plus construction from configuration.

pub mod provider;
pub mod rest;

pub use provider::{InMemoryQueueStore, MockQueueStore, QueueStore};
pub use rest::{RestQueueStore, RestStoreConfig};

use crate::config::{StoreBackend, StoreSettings};
use std::sync::Arc;
use tracing::info;

/// Build the configured store backend
pub fn from_settings(settings: &StoreSettings) -> crate::error::Result<Arc<dyn QueueStore>> {
    match settings.backend {
        StoreBackend::Memory => {
            info!("Using in-memory queue store");
            Ok(Arc::new(InMemoryQueueStore::new()))
        }
        StoreBackend::Rest => {
            info!("Using REST queue store at {}", settings.url);
            Ok(Arc::new(RestQueueStore::new(RestStoreConfig::from(settings))?))
        }
    }
}
