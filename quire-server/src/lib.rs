//! HTTP service and persistence for the Quire peer-review tracker.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod store;

use std::sync::Arc;

use store::Store;

/// Shared application state: the entity store behind every handler.
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}
