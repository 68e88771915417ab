//! Multipart upload extraction shared by the import handlers.

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use verdant_core::import::file::UploadedFile;
use verdant_core::import::template::TemplateFile;

use crate::error::{AppError, AppResult};

/// The fields of an import upload form.
#[derive(Debug)]
pub struct ImportUpload {
    pub file: UploadedFile,
    /// Target type id from the `import_type` field.
    pub import_type: Option<String>,
    pub update_existing: bool,
}

/// Read `file`, `import_type` and `update_existing` from a multipart form.
///
/// Unknown fields are ignored. A missing `file` field is a bad request.
pub async fn read_import_upload(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> AppResult<ImportUpload> {
    let mut file = None;
    let mut import_type = None;
    let mut update_existing = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if data.len() > max_upload_bytes {
                    return Err(AppError::PayloadTooLarge {
                        size: data.len(),
                        limit: max_upload_bytes,
                    });
                }
                file = Some(UploadedFile::new(file_name, content_type, data.to_vec()));
            }
            "import_type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                import_type = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            "update_existing" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                update_existing = parse_flag(&value)?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    Ok(ImportUpload {
        file,
        import_type,
        update_existing,
    })
}

fn parse_flag(value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "off" | "no" => Ok(false),
        "true" | "1" | "on" | "yes" => Ok(true),
        other => Err(AppError::BadRequest(format!(
            "update_existing must be true or false, got '{other}'"
        ))),
    }
}

/// Serve a template as a CSV download.
pub fn csv_attachment(template: TemplateFile) -> Response {
    (
        [
            (CONTENT_TYPE, template.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", template.file_name),
            ),
        ],
        template.bytes,
    )
        .into_response()
}
