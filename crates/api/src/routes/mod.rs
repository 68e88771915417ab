pub mod health;
pub mod import;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /import/targets                  list importable types
/// /import/validate                 validate an uploaded file (POST, multipart)
/// /import/commit                   commit an uploaded file (POST, multipart)
/// /import/status                   record counts per type
/// /import/template/{type}          header-only CSV template
///
/// /users/bulk-import               bulk account import (POST, multipart)
/// /users/import-template           user import CSV template
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/import", import::router())
        .nest("/users", users::router())
}
