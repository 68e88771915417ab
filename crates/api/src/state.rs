use std::sync::Arc;

use verdant_core::import::store::ImportStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend for imports (PostgreSQL, or in-memory when no database is configured).
    pub store: Arc<dyn ImportStore>,
    pub config: Arc<ServerConfig>,
}
