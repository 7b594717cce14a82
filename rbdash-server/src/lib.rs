//! rbdash HTTP service: application state and API routes

pub mod error;
pub mod routes;

use std::sync::Arc;

use rbdash_core::config::DashboardConfig;
use rbdash_core::log::LogStore;

pub use routes::router;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub store: Arc<LogStore>,
}

impl AppState {
    pub fn new(config: DashboardConfig, store: LogStore) -> Self {
        AppState {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}
