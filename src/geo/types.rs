//! Core types for the positioning subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accuracy assigned to the fallback coordinate. Deliberately terrible so
/// nothing downstream mistakes it for a usable fix.
pub const FALLBACK_ACCURACY_M: f64 = 99_999.0;

/// Fallback coordinate used when sampling produced no fix at all.
/// Center of the default deployment region (Zirakpur, Punjab); always
/// accompanied by a set `error` field, never returned silently.
pub const FALLBACK_LAT: f64 = 30.6425;
pub const FALLBACK_LON: f64 = 76.8173;

/// One raw reading from a positioning sensor.
///
/// Immutable; folded into a [`RefinedLocation`] and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated error radius reported by the sensor, in meters.
    pub accuracy_m: f64,
    pub captured_at: DateTime<Utc>,
    /// 1-based sampling attempt that produced this fix.
    pub attempt: u32,
}

/// The single best-estimate coordinate produced by the refiner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    /// How many fixes were folded into this estimate.
    pub sample_count: usize,
    /// True when more than one fix contributed (weighted centroid).
    pub is_averaged: bool,
    pub produced_at: DateTime<Utc>,
    /// Set when this is the flagged fallback coordinate, not a real fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefinedLocation {
    /// The documented fallback value: fixed coordinate, flagged error.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            latitude: FALLBACK_LAT,
            longitude: FALLBACK_LON,
            accuracy_m: FALLBACK_ACCURACY_M,
            sample_count: 0,
            is_averaged: false,
            produced_at: Utc::now(),
            error: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// A raw coordinate triple handed back by a sensor, before the sampler
/// stamps it with attempt metadata.
#[derive(Debug, Clone, Copy)]
pub struct SensorReading {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
}

/// Positioning errors. All of these are expected environmental failures
/// and travel as values, never as panics.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}
