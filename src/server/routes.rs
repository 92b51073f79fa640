// REST API routes for the analysis server
// Uploads arrive as the raw request body; plots go back as base64 PNGs.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::AnalysisServerState;
use crate::audio::filter::{FilterBand, FilterSettings, FILTER_DISABLED};
use crate::commands::{visualizations, VisualizationInfo};
use crate::error::Error;
use crate::pipeline::{analyze_bytes, AnalysisReport};

/// Seconds a client should wait after a 503
const RETRY_AFTER_SECS: &str = "5";

// ---- Request/Response types ----

fn filter_disabled() -> i32 {
    FILTER_DISABLED
}

/// Query string of `POST /api/analyze`. Unset filters stay disabled.
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub filename: Option<String>,
    #[serde(default = "filter_disabled")]
    pub highpass: i32,
    #[serde(default = "filter_disabled")]
    pub lowpass: i32,
    #[serde(default = "filter_disabled")]
    pub bandpass_low: i32,
    #[serde(default = "filter_disabled")]
    pub bandpass_high: i32,
}

impl AnalyzeParams {
    fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            highpass_hz: self.highpass,
            lowpass_hz: self.lowpass,
            bandpass_low_hz: self.bandpass_low,
            bandpass_high_hz: self.bandpass_high,
        }
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub active_jobs: usize,
    pub max_queue: usize,
}

#[derive(Debug, Serialize)]
pub struct PlotDTO {
    pub name: &'static str,
    pub slug: &'static str,
    pub label: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub png_base64: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub file_name: String,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub filters: Vec<FilterBand>,
    pub median_tempo_bpm: Option<f32>,
    pub plots: Vec<PlotDTO>,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        let plots = report
            .plots
            .into_iter()
            .map(|plot| PlotDTO {
                name: plot.visualization.name(),
                slug: plot.visualization.slug(),
                label: plot.visualization.label(),
                title: plot.title,
                width: plot.width,
                height: plot.height,
                png_base64: STANDARD.encode(&plot.png),
            })
            .collect();

        AnalyzeResponse {
            file_name: report.file_name,
            sample_rate: report.sample_rate,
            duration_ms: report.duration_ms,
            filters: report.filters,
            median_tempo_bpm: report.median_tempo_bpm,
            plots,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler failures, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Every analysis slot is taken
    Busy,
    BadRequest(String),
    /// An extractor refused the request (bad query string, oversized body)
    Rejected(StatusCode, String),
    Analysis(Error),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(status, _) => *status,
            ApiError::Analysis(
                Error::Decode(_) | Error::NoAudioTrack | Error::EmptyAudio,
            ) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(e) if e.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Analysis(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Busy => "too many analyses in progress, retry shortly".to_string(),
            ApiError::BadRequest(msg) | ApiError::Internal(msg) | ApiError::Rejected(_, msg) => {
                msg.clone()
            }
            ApiError::Analysis(e) => e.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Analysis(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.message(),
        });
        match self {
            ApiError::Busy => (
                status,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

// ---- Route registration ----

pub fn api_routes() -> Router<Arc<AnalysisServerState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/visualizations", get(get_visualizations))
        .route("/api/analyze", post(analyze))
}

// ---- Handlers ----

async fn get_status(State(state): State<Arc<AnalysisServerState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: "audiofeat".to_string(),
        version: crate::VERSION.to_string(),
        active_jobs: state.active_job_count(),
        max_queue: state.max_queue,
    })
}

async fn get_visualizations() -> Json<Vec<VisualizationInfo>> {
    Json(visualizations())
}

async fn analyze(
    State(state): State<Arc<AnalysisServerState>>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Query(params) = params?;
    let body = body?;
    if body.is_empty() {
        return Err(ApiError::BadRequest(
            "request body must contain an audio file".to_string(),
        ));
    }

    let filters = params.filter_settings();
    filters.validate()?;

    let guard = state.try_acquire().ok_or_else(|| {
        warn!(max_queue = state.max_queue, "analysis queue full");
        ApiError::Busy
    })?;

    let file_name = params
        .filename
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let config = state.config.clone();

    info!(file = %file_name, bytes = body.len(), "analysis requested");

    // The slot stays held until the blocking work ends, even if the client goes away
    let report = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        analyze_bytes(&file_name, body.to_vec(), &filters, &config)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("analysis task failed: {}", e)))??;

    Ok(Json(AnalyzeResponse::from(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_to_disabled_filters() {
        let params: AnalyzeParams = serde_json::from_str(r#"{"filename": "a.wav"}"#).unwrap();
        assert_eq!(params.filter_settings(), FilterSettings::default());

        let params: AnalyzeParams =
            serde_json::from_str(r#"{"highpass": 300, "bandpass_high": 4000}"#).unwrap();
        let settings = params.filter_settings();
        assert_eq!(settings.highpass_hz, 300);
        assert_eq!(settings.bandpass_high_hz, 4000);
        assert_eq!(settings.lowpass_hz, FILTER_DISABLED);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::Busy.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(Error::Decode("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::InvalidFilter("bad".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(Error::Render("oops".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejection_keeps_its_status() {
        let error = ApiError::Rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big".to_string());
        assert_eq!(error.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(error.message(), "too big");
    }

    #[test]
    fn test_busy_response_has_retry_after() {
        let response = ApiError::Busy.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            RETRY_AFTER_SECS
        );
    }
}
