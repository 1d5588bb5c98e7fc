mod crawl;
mod files;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rescrawl_export::FileSink;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::jobs::JobManager;
use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobManager,
    pub sink: FileSink,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    job_running: bool,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/start", post(crawl::start_job))
        .route("/api/status", get(crawl::job_status))
        .route("/api/cancel", post(crawl::cancel_job))
        .route("/api/files", get(files::list_files))
        .route("/api/download/{filename}", get(files::download_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            job_running: state.jobs.status().running,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use rescrawl_core::ReservationRecord;
    use rescrawl_export::{OutputFormat, Sink};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::jobs::testing::{wait_until_idle, GatedExecutor};

    struct Harness {
        _dir: TempDir,
        executor: GatedExecutor,
        state: AppState,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let executor = GatedExecutor::default();
        let state = AppState {
            jobs: JobManager::new(Arc::new(executor.clone()), "마리엠헤어"),
            sink: FileSink::new(dir.path()),
        };
        Harness {
            _dir: dir,
            executor,
            state,
        }
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_app(state.clone())
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn start(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/start")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "already running").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn health_echoes_request_id() {
        let h = harness();
        let response = build_app(h.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["job_running"], false);
        assert_eq!(json["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn start_then_conflict_then_completion() {
        let h = harness();
        let body = serde_json::json!({ "start_date": "2025-12-04", "end_date": "2025-12-05" });

        let (status, json) = send(&h.state, start(&body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["data"]["running"], true);
        assert_eq!(json["data"]["total"], 2);

        let (status, json) = send(&h.state, start(&body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");
        assert_eq!(json["error"]["message"], "already running");

        h.executor.release();
        wait_until_idle(&h.state.jobs).await;
        let (status, json) = send(&h.state, get("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["running"], false);
        assert_eq!(json["data"]["result_file"], "reservations_test.csv");
    }

    #[tokio::test]
    async fn start_rejects_invalid_dates() {
        let h = harness();
        let (status, json) = send(
            &h.state,
            start(&serde_json::json!({ "start_date": "12/05/2025" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["error"]["message"]
            .as_str()
            .expect("message")
            .starts_with("invalid date"));
        assert!(!h.state.jobs.status().running);
    }

    #[tokio::test]
    async fn cancel_without_a_job_is_not_found() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/cancel")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn files_are_listed_and_downloadable() {
        let h = harness();
        let mut record =
            ReservationRecord::new(NaiveDate::from_ymd_opt(2025, 12, 5).expect("valid date"));
        record.reservation_number = "R-1".to_string();
        h.state
            .sink
            .write_batch(&[record], OutputFormat::Csv, Some("reservations_마리엠헤어"))
            .expect("write");

        let (status, json) = send(&h.state, get("/api/files")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["name"], "reservations_마리엠헤어.csv");

        let response = build_app(h.state.clone())
            .oneshot(get(
                "/api/download/reservations_%EB%A7%88%EB%A6%AC%EC%97%A0%ED%97%A4%EC%96%B4.csv",
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("disposition")
            .to_string();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename*=UTF-8''reservations_%EB%A7%88"));
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert!(body.starts_with("\u{feff}date,".as_bytes()));
    }

    #[tokio::test]
    async fn download_rejects_bad_names_and_missing_files() {
        let h = harness();
        let (status, json) = send(&h.state, get("/api/download/.env")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");

        let (status, json) = send(&h.state, get("/api/download/missing.csv")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }
}
