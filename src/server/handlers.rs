use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::address::{consensus, ConsensusAddress, Orchestrator};
use crate::geo::StaticSensor;
use crate::service::{Resolution, ResolutionService, ResolveOptions, DEFAULT_CLAIMED_ACCURACY_M};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn check_coords(lat: f64, lon: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lon: -180..180",
        ));
    }
    Ok(())
}

fn log_request(path: &str, lat: f64, lon: f64, started: Instant) {
    eprintln!(
        "[{}] GET {}?lat={}&lon={} ({:.1}ms)",
        Utc::now().format("%H:%M:%S"),
        path,
        lat,
        lon,
        started.elapsed().as_secs_f64() * 1000.0,
    );
}

// ─── GET /api/reverse ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
}

/// Reverse-geocode one coordinate: provider fan-out plus consensus, no
/// sampling.
pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQuery>,
) -> Result<Json<ConsensusAddress>, ApiError> {
    let started = Instant::now();
    check_coords(params.lat, params.lon)?;

    let config = state.config.clone();
    let (lat, lon) = (params.lat, params.lon);
    let address = tokio::task::spawn_blocking(move || {
        let orchestrator = Orchestrator::from_config(&config);
        let candidates = orchestrator.collect(lat, lon);
        consensus::resolve(&candidates, lat, lon, &config)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    log_request("/api/reverse", lat, lon, started);
    Ok(Json(address))
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FullResolveQuery {
    pub lat: f64,
    pub lon: f64,
    /// Claimed accuracy of the supplied coordinate, meters.
    pub accuracy: Option<f64>,
    pub attempts: Option<u32>,
    pub high_accuracy: Option<bool>,
    pub include_address: Option<bool>,
    pub deadline_secs: Option<u64>,
}

/// Run the full pipeline with the supplied coordinate standing in for the
/// device sensor.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FullResolveQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let started = Instant::now();
    check_coords(params.lat, params.lon)?;

    let sensor = StaticSensor {
        latitude: params.lat,
        longitude: params.lon,
        accuracy_m: params.accuracy.unwrap_or(DEFAULT_CLAIMED_ACCURACY_M),
    };
    let opts = ResolveOptions {
        max_attempts: params.attempts.unwrap_or(2),
        high_accuracy: params.high_accuracy.unwrap_or(false),
        include_address: params.include_address.unwrap_or(true),
        deadline: params.deadline_secs.map(Duration::from_secs),
        ..ResolveOptions::default()
    };

    let config = state.config.clone();
    let resolution = tokio::task::spawn_blocking(move || {
        ResolutionService::from_config(Box::new(sensor), config).resolve(&opts)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    log_request("/api/resolve", params.lat, params.lon, started);
    Ok(Json(resolution))
}

// ─── GET /api/providers ──────────────────────────────────────────

#[derive(Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Whether a key is configured; the key itself is never exposed.
    pub has_key: bool,
}

pub async fn providers(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderInfo>> {
    Json(
        state
            .config
            .providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name.clone(),
                enabled: p.enabled,
                timeout_secs: p.timeout_secs,
                has_key: p.api_key.is_some(),
            })
            .collect(),
    )
}
