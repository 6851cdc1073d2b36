//! Resolution service — the top-level pipeline.
//!
//! Sampler → Refiner → Orchestrator → Consensus. Expected failures (no
//! fix, no network, every provider down) never surface as errors: the
//! caller always receives a complete result with `error`/`confidence`
//! fields explaining any degradation. The only rejected input is a
//! malformed option set, which is a programming error at the boundary.

use crate::address::{consensus, ConsensusAddress, Orchestrator};
use crate::config::Config;
use crate::geo::{refine, CancelToken, FixStream, RefinedLocation, SamplerConfig, SensorPort};
use log::{debug, info};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Caller-facing knobs for one resolution request.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub max_attempts: u32,
    pub excellent_accuracy_m: f64,
    pub include_address: bool,
    /// Samples more attempts (5 rather than 2). A configuration toggle,
    /// not a different code path.
    pub high_accuracy: bool,
    /// Overall budget. When exceeded, remaining sampling attempts are
    /// skipped and the pipeline proceeds with whatever fixes exist.
    pub deadline: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            excellent_accuracy_m: 5.0,
            include_address: true,
            high_accuracy: false,
            deadline: None,
        }
    }
}

/// Attempts used when `high_accuracy` is on.
const HIGH_ACCURACY_ATTEMPTS: u32 = 5;

/// Accuracy claimed for a caller-supplied coordinate when none is given.
/// Sits just under the default excellent threshold so a trusted static
/// fix satisfies the early stop on the first attempt.
pub const DEFAULT_CLAIMED_ACCURACY_M: f64 = 4.9;

/// The combined answer: where, and what address that is.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub location: RefinedLocation,
    pub address: ConsensusAddress,
}

/// The one error this API throws. Environmental failures travel inside
/// [`Resolution`] instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid options: {0}")]
    InvalidInput(String),
}

pub struct ResolutionService {
    sensor: Box<dyn SensorPort + Send + Sync>,
    orchestrator: Orchestrator,
    config: Config,
}

impl ResolutionService {
    pub fn new(
        sensor: Box<dyn SensorPort + Send + Sync>,
        orchestrator: Orchestrator,
        config: Config,
    ) -> Self {
        Self { sensor, orchestrator, config }
    }

    /// Build the orchestrator from the config's provider registry.
    pub fn from_config(sensor: Box<dyn SensorPort + Send + Sync>, config: Config) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self::new(sensor, orchestrator, config)
    }

    pub fn resolve(&self, opts: &ResolveOptions) -> Result<Resolution, ResolveError> {
        self.resolve_with_cancel(opts, CancelToken::new())
    }

    /// As [`resolve`](Self::resolve), with a caller-held cancellation
    /// handle. Cancelling mid-sampling keeps the fixes already collected.
    pub fn resolve_with_cancel(
        &self,
        opts: &ResolveOptions,
        cancel: CancelToken,
    ) -> Result<Resolution, ResolveError> {
        validate(opts)?;

        let max_attempts = if opts.high_accuracy {
            opts.max_attempts.max(HIGH_ACCURACY_ATTEMPTS)
        } else {
            opts.max_attempts
        };
        let sampler_config = SamplerConfig {
            max_attempts,
            excellent_accuracy_m: opts.excellent_accuracy_m,
            ..SamplerConfig::default()
        };
        let deadline = opts.deadline.map(|d| Instant::now() + d);

        let fixes: Vec<_> =
            FixStream::with_cancel(self.sensor.as_ref(), sampler_config, cancel, deadline)
                .collect();
        debug!("collected {} fix(es) in {} allowed attempt(s)", fixes.len(), max_attempts);

        let location = refine(&fixes).unwrap_or_else(|| {
            let reason = format!("no location fix obtained in {} attempt(s)", max_attempts);
            info!("{}; returning fallback coordinate", reason);
            RefinedLocation::fallback(reason)
        });

        // The flagged fallback coordinate never reaches the providers.
        let address = if location.is_fallback() {
            let reason = location.error.as_deref().unwrap_or("no location fix");
            ConsensusAddress::unavailable(format!("location unavailable: {}", reason))
        } else if opts.include_address {
            let candidates = self.orchestrator.collect(location.latitude, location.longitude);
            consensus::resolve(&candidates, location.latitude, location.longitude, &self.config)
        } else {
            ConsensusAddress::unavailable("address lookup skipped by request")
        };

        Ok(Resolution { location, address })
    }
}

fn validate(opts: &ResolveOptions) -> Result<(), ResolveError> {
    if opts.max_attempts == 0 {
        return Err(ResolveError::InvalidInput("max_attempts must be at least 1".into()));
    }
    if !opts.excellent_accuracy_m.is_finite() || opts.excellent_accuracy_m <= 0.0 {
        return Err(ResolveError::InvalidInput(
            "excellent_accuracy_m must be a positive number".into(),
        ));
    }
    Ok(())
}
