//! Route definitions for user account import.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST /bulk-import        -> bulk_import
/// GET  /import-template    -> import_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bulk-import", post(users::bulk_import))
        .route("/import-template", get(users::import_template))
}
