use std::sync::Arc;

use scripta_core::plans::PlanCatalog;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: scripta_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Immutable plan catalog, constructed once at startup and shared by the
    /// pricing and payment paths.
    pub catalog: Arc<PlanCatalog>,
}
