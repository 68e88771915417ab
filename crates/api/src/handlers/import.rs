//! Handlers for the `/import` resource.

use axum::extract::{Multipart, Path, State};
use axum::response::Response;
use axum::Json;
use verdant_core::import::committer::{commit, ImportRequest};
use verdant_core::import::status::{snapshot, StatusSnapshot};
use verdant_core::import::target::{get_target, list_targets};
use verdant_core::import::template::template_for;
use verdant_core::import::validator::validate_with_references;
use verdant_core::import::{ImportResult, ImportTarget, ValidationReport};

use crate::error::{AppError, AppResult};
use crate::handlers::upload::{csv_attachment, read_import_upload, ImportUpload};
use crate::response::DataResponse;
use crate::state::AppState;

fn resolve_target(import_type: Option<&str>) -> AppResult<&'static ImportTarget> {
    let import_type = import_type
        .ok_or_else(|| AppError::BadRequest("Missing 'import_type' field".to_string()))?;
    Ok(get_target(import_type)?)
}

// ── Targets ──────────────────────────────────────────────────────────

/// GET /api/v1/import/targets
pub async fn list_import_targets() -> Json<DataResponse<Vec<&'static ImportTarget>>> {
    Json(DataResponse {
        data: list_targets(),
    })
}

// ── Validate ─────────────────────────────────────────────────────────

/// POST /api/v1/import/validate
///
/// Read-only: produces a validation report with a preview of the first rows.
pub async fn validate_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<ValidationReport>>> {
    let ImportUpload {
        file, import_type, ..
    } = read_import_upload(multipart, state.config.max_upload_bytes).await?;
    let target = resolve_target(import_type.as_deref())?;

    let report = validate_with_references(
        state.store.as_ref(),
        &file,
        target,
        state.config.max_upload_bytes,
    )
    .await;
    tracing::info!(
        import_type = %target.kind,
        file = %file.file_name,
        valid = report.valid,
        rows = report.total_rows,
        "Validated import file",
    );
    Ok(Json(DataResponse { data: report }))
}

// ── Commit ───────────────────────────────────────────────────────────

/// POST /api/v1/import/commit
///
/// Re-validates the file and writes rows one at a time. Row failures are
/// reported in the result; the response is 200 whenever the request itself
/// was well-formed.
pub async fn commit_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<ImportResult>>> {
    let upload = read_import_upload(multipart, state.config.max_upload_bytes).await?;
    let target = resolve_target(upload.import_type.as_deref())?;

    let request = ImportRequest::new(target.kind, upload.file, upload.update_existing)
        .with_max_file_bytes(state.config.max_upload_bytes);
    let result = commit(state.store.as_ref(), &request).await;
    Ok(Json(DataResponse { data: result }))
}

// ── Status ───────────────────────────────────────────────────────────

/// GET /api/v1/import/status
pub async fn import_status(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<StatusSnapshot>>> {
    let status = snapshot(state.store.as_ref()).await?;
    Ok(Json(DataResponse { data: status }))
}

// ── Templates ────────────────────────────────────────────────────────

/// GET /api/v1/import/template/{type}
pub async fn download_template(Path(import_type): Path<String>) -> AppResult<Response> {
    let target = get_target(&import_type)?;
    let template =
        template_for(target).map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(csv_attachment(template))
}
