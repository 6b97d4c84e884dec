//! API request handlers
//!
//! Handlers for all REST API endpoints. Workbook work runs on the blocking
//! pool; every JSON answer uses the [`ApiResponse`] envelope.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::envelope::{Envelope, EstimateSummary};
use crate::error::{EstimateError, EstimateResult};
use crate::excel::{
    download_file_name, inspect_template, populate_bytes, read_template, safe_project_name,
    ExcelExporter, FillReport,
};

use super::server::AppState;

/// MIME type of .xlsx workbooks
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 400 for problems with the caller's payload or template, 500 otherwise
fn error_response(e: EstimateError) -> Response {
    let status = if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error!(%status, error = %e, "request failed");
    (status, Json(ApiResponse::<()>::err(e.to_string()))).into_response()
}

fn join_error_response(e: tokio::task::JoinError) -> Response {
    error!(error = %e, "worker task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::err(format!("Worker task failed: {}", e))),
    )
        .into_response()
}

fn xlsx_response(bytes: Vec<u8>, filename: &str, report: Option<&FillReport>) -> Response {
    let mut headers = vec![
        (header::CONTENT_TYPE, XLSX_MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    if let Some(report) = report {
        headers.push((
            HeaderName::from_static("x-rows-written"),
            report.rows_written.to_string(),
        ));
        headers.push((
            HeaderName::from_static("x-rows-skipped"),
            report.rows_skipped().to_string(),
        ));
    }

    let mut response = bytes.into_response();
    for (name, value) in headers {
        if let Ok(value) = value.parse::<HeaderValue>() {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(path: &str, method: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Estimate Forge API Server".to_string(),
        version: state.version.clone(),
        description: "Fills Excel estimation templates from JSON payloads".to_string(),
        endpoints: vec![
            EndpointInfo::new("/health", "GET", "Health check endpoint"),
            EndpointInfo::new("/version", "GET", "Get server version"),
            EndpointInfo::new(
                "/api/v1/populate",
                "POST",
                "Fill the Estimation sheet of a template and download it",
            ),
            EndpointInfo::new(
                "/api/v1/inspect",
                "POST",
                "Report how a template would be filled",
            ),
            EndpointInfo::new("/api/v1/summary", "POST", "Totals for a payload"),
            EndpointInfo::new(
                "/api/v1/export",
                "POST",
                "Features/Summary workbook for a payload",
            ),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec![
            "populate".to_string(),
            "inspect".to_string(),
            "summary".to_string(),
            "export".to_string(),
        ],
    }))
}

/// Populate request
#[derive(Deserialize)]
pub struct PopulateRequest {
    pub envelope: serde_json::Value,
    #[serde(default)]
    pub template_path: Option<String>,
}

/// Template named by the request, then the configured one, then the built-in one
fn resolve_template(requested: Option<String>, state: &AppState) -> Option<PathBuf> {
    requested
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| state.template_path.clone())
}

fn run_populate(
    envelope: serde_json::Value,
    template: Option<PathBuf>,
) -> EstimateResult<(Vec<u8>, FillReport, String)> {
    let envelope = Envelope::from_value(envelope)?;
    let template_bytes = template.as_deref().map(read_template).transpose()?;
    let (bytes, report) = populate_bytes(template_bytes.as_deref(), &envelope)?;
    Ok((bytes, report, envelope.project.name))
}

/// POST /api/v1/populate - Fill a template and return the workbook
pub async fn populate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PopulateRequest>,
) -> Response {
    let template = resolve_template(req.template_path, &state);
    let envelope = req.envelope;

    match tokio::task::spawn_blocking(move || run_populate(envelope, template)).await {
        Ok(Ok((bytes, report, project))) => {
            let filename = download_file_name(&project, Local::now());
            info!(
                file = %filename,
                rows_written = report.rows_written,
                rows_skipped = report.rows_skipped(),
                "populated workbook"
            );
            xlsx_response(bytes, &filename, Some(&report))
        }
        Ok(Err(e)) => error_response(e),
        Err(e) => join_error_response(e),
    }
}

/// Inspect request
#[derive(Deserialize)]
pub struct InspectRequest {
    pub template_path: String,
}

/// POST /api/v1/inspect - Report how a template would be filled
pub async fn inspect(Json(req): Json<InspectRequest>) -> Response {
    let path = PathBuf::from(&req.template_path);

    match tokio::task::spawn_blocking(move || inspect_template(&path)).await {
        Ok(Ok(report)) => Json(ApiResponse::ok(report)).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => join_error_response(e),
    }
}

/// POST /api/v1/summary - Totals for a payload
pub async fn summary(Json(envelope): Json<serde_json::Value>) -> Response {
    match Envelope::from_value(envelope) {
        Ok(envelope) => {
            Json(ApiResponse::ok(EstimateSummary::from_envelope(&envelope))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/export - Features/Summary workbook for a payload
pub async fn export(Json(envelope): Json<serde_json::Value>) -> Response {
    let result = tokio::task::spawn_blocking(move || {
        let envelope = Envelope::from_value(envelope)?;
        let name = format!(
            "{}_FEATURES_{}.xlsx",
            safe_project_name(&envelope.project.name),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let bytes = ExcelExporter::new(envelope).export_to_buffer()?;
        Ok::<_, EstimateError>((bytes, name))
    })
    .await;

    match result {
        Ok(Ok((bytes, name))) => xlsx_response(bytes, &name, None),
        Ok(Err(e)) => error_response(e),
        Err(e) => join_error_response(e),
    }
}
