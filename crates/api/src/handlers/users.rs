//! Handlers for bulk user account import.

use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use verdant_core::import::template::user_import_template;
use verdant_core::import::users::bulk_import_users;
use verdant_core::import::BulkUserImportResult;

use crate::error::{AppError, AppResult};
use crate::handlers::upload::{csv_attachment, read_import_upload};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/users/bulk-import
///
/// Creates one account per row. Generated temporary passwords are returned
/// in the response only; they are never stored in plain text.
pub async fn bulk_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<BulkUserImportResult>>> {
    let upload = read_import_upload(multipart, state.config.max_upload_bytes).await?;
    let result = bulk_import_users(
        state.store.as_ref(),
        &upload.file,
        state.config.max_upload_bytes,
    )
    .await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/users/import-template
pub async fn import_template() -> AppResult<Response> {
    let template = user_import_template().map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(csv_attachment(template))
}
