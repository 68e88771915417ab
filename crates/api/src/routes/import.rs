//! Route definitions for the `/import` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::import;
use crate::state::AppState;

/// Routes mounted at `/import`.
///
/// ```text
/// GET  /targets           -> list_import_targets
/// POST /validate          -> validate_import
/// POST /commit            -> commit_import
/// GET  /status            -> import_status
/// GET  /template/{type}   -> download_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/targets", get(import::list_import_targets))
        .route("/validate", post(import::validate_import))
        .route("/commit", post(import::commit_import))
        .route("/status", get(import::import_status))
        .route("/template/{import_type}", get(import::download_template))
}
