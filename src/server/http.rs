//! HTTP/JSON surface.
//!
//! | Route                           | Body                          | Reply      |
//! |---------------------------------|-------------------------------|------------|
//! | `GET  /health`                  |                               | `OK`       |
//! | `GET  /process/digest`          |                               | digest     |
//! | `POST /process/{control}`       | `{paths}`                     | `bool`     |
//! | `POST /process/signal`          | `{signal, paths}`             | `[bool]`   |
//! | `GET  /share/digest`            |                               | digest     |
//! | `POST /share/read-log`          | `{path, fromByte?, toByte?}`  | bytes      |
//! | `POST /share/read-kernel-info`  | `{path}`                      | bytes      |
//!
//! `{control}` is one of `run`, `step`, `pause`, `no-compute`, `exit`.
//! Calls rejected by an agent's rate limit answer `429 Too Many Requests`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path as RoutePath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::share::ShareError;

use super::agent::{ProcessAgent, ShareAgent};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub process: Arc<ProcessAgent>,
    pub share: Arc<ShareAgent>,
}

#[derive(Debug, Deserialize)]
pub struct PathsRequest {
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub signal: i32,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadLogRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub from_byte: u64,
    #[serde(default)]
    pub to_byte: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReadKernelRequest {
    pub path: PathBuf,
}

fn rate_limited() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response()
}

fn json_or_limited<T: serde::Serialize>(value: Option<T>) -> Response {
    match value {
        Some(value) => Json(value).into_response(),
        None => rate_limited(),
    }
}

fn bytes_or_error(result: Option<Result<Vec<u8>, ShareError>>) -> Response {
    match result {
        None => rate_limited(),
        Some(Ok(bytes)) => bytes.into_response(),
        Some(Err(e)) => {
            let status = match &e {
                ShareError::NotTracked { .. } => StatusCode::NOT_FOUND,
                ShareError::Read { source, .. }
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    StatusCode::NOT_FOUND
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string()).into_response()
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn process_digest(State(state): State<AppState>) -> Response {
    json_or_limited(state.process.generate_digest())
}

async fn process_control(
    State(state): State<AppState>,
    RoutePath(control): RoutePath<String>,
    Json(request): Json<PathsRequest>,
) -> Response {
    let agent = &state.process;
    let paths = &request.paths;
    let result = match control.as_str() {
        "run" => agent.run(paths),
        "step" => agent.step(paths),
        "pause" => agent.pause(paths),
        "no-compute" => agent.no_compute(paths),
        "exit" => agent.exit(paths),
        other => {
            return (StatusCode::NOT_FOUND, format!("unknown control '{other}'")).into_response();
        }
    };
    json_or_limited(result)
}

async fn process_signal(
    State(state): State<AppState>,
    Json(request): Json<SignalRequest>,
) -> Response {
    json_or_limited(state.process.signal(request.signal, &request.paths))
}

async fn share_digest(State(state): State<AppState>) -> Response {
    json_or_limited(state.share.generate_digest())
}

async fn share_read_log(
    State(state): State<AppState>,
    Json(request): Json<ReadLogRequest>,
) -> Response {
    bytes_or_error(
        state
            .share
            .read_log(&request.path, request.from_byte, request.to_byte)
            .await,
    )
}

async fn share_read_kernel_info(
    State(state): State<AppState>,
    Json(request): Json<ReadKernelRequest>,
) -> Response {
    bytes_or_error(state.share.read_kernel_info(&request.path).await)
}

/// Build the router; gzip compression is applied when `compression` is set.
pub fn router(state: AppState, compression: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/process/digest", get(process_digest))
        .route("/process/signal", post(process_signal))
        .route("/process/{control}", post(process_control))
        .route("/share/digest", get(share_digest))
        .route("/share/read-log", post(share_read_log))
        .route("/share/read-kernel-info", post(share_read_kernel_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if compression {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}
