use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rescrawl_export::{ExportError, FileEntry};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

fn map_export_error(request_id: String, error: &ExportError) -> ApiError {
    match error {
        ExportError::InvalidFileName(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        ExportError::NotFound(_) => ApiError::new(request_id, "not_found", error.to_string()),
        _ => {
            tracing::error!(error = %error, "output directory access failed");
            ApiError::new(request_id, "internal_error", "failed to read output directory")
        }
    }
}

fn content_type(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// `attachment` with an ASCII fallback name and the RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(filename, NON_ALPHANUMERIC)
    )
}

pub(super) async fn list_files(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<FileEntry>>>, ApiError> {
    let files = state
        .sink
        .list_files()
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data: files,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn download_file(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .sink
        .resolve(&filename)
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "failed to read export");
        ApiError::new(req_id.0.clone(), "internal_error", "failed to read file")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&filename).to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        bytes,
    )
        .into_response())
}
