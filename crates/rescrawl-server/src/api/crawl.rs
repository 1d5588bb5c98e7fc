use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::jobs::{JobStatus, StartError, StartRequest};
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn start_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobStatus>>), ApiError> {
    match state.jobs.start(request) {
        Ok(status) => Ok((
            StatusCode::ACCEPTED,
            Json(ApiResponse {
                data: status,
                meta: ResponseMeta::new(req_id.0),
            }),
        )),
        Err(err @ StartError::AlreadyRunning) => {
            Err(ApiError::new(req_id.0, "conflict", err.to_string()))
        }
        Err(err @ StartError::InvalidDate(_)) => {
            Err(ApiError::new(req_id.0, "validation_error", err.to_string()))
        }
    }
}

pub(super) async fn job_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<JobStatus>> {
    Json(ApiResponse {
        data: state.jobs.status(),
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn cancel_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<JobStatus>>, ApiError> {
    if !state.jobs.cancel() {
        return Err(ApiError::new(req_id.0, "not_found", "no job is running"));
    }
    Ok(Json(ApiResponse {
        data: state.jobs.status(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
