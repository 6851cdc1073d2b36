//! Fix sampling — pulls readings from a sensor until they are good enough.
//!
//! The sampler is a lazy iterator: each `next()` performs one bounded sensor
//! read, so the caller sees fixes as they arrive and can stop consuming at
//! any point. Sampling stops early the first time a fix beats the
//! excellent-accuracy threshold; a failed read waits a longer back-off than
//! the normal inter-attempt delay before retrying.

use super::types::{GeoError, LocationFix, SensorReading};
use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A positioning sensor. One call, one reading, bounded by `timeout`.
///
/// `desired_accuracy_m` is a hint for hardware that supports power/accuracy
/// trade-offs; implementations may ignore it.
pub trait SensorPort {
    fn one_fix(&self, timeout: Duration, desired_accuracy_m: f64) -> Result<SensorReading, GeoError>;
}

/// Caller-held cancellation handle. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs for one sampling session.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub max_attempts: u32,
    /// A fix below this accuracy stops the session early.
    pub excellent_accuracy_m: f64,
    /// Bound on a single sensor read.
    pub attempt_timeout: Duration,
    /// Pause between successful attempts.
    pub inter_attempt_delay: Duration,
    /// Pause after a failed attempt. Longer than the inter-attempt delay.
    pub failure_backoff: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            excellent_accuracy_m: 5.0,
            attempt_timeout: Duration::from_secs(15),
            inter_attempt_delay: Duration::from_secs(2),
            failure_backoff: Duration::from_secs(3),
        }
    }
}

/// Lazy, finite stream of fixes. Not restartable: build a new one per
/// sampling session.
pub struct FixStream<'a> {
    sensor: &'a dyn SensorPort,
    config: SamplerConfig,
    cancel: CancelToken,
    deadline: Option<Instant>,
    attempt: u32,
    pending_delay: Option<Duration>,
    done: bool,
}

impl<'a> FixStream<'a> {
    pub fn new(sensor: &'a dyn SensorPort, config: SamplerConfig) -> Self {
        Self::with_cancel(sensor, config, CancelToken::new(), None)
    }

    pub fn with_cancel(
        sensor: &'a dyn SensorPort,
        config: SamplerConfig,
        cancel: CancelToken,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            sensor,
            config,
            cancel,
            deadline,
            attempt: 0,
            pending_delay: None,
            done: false,
        }
    }

    fn expired(&self) -> bool {
        self.cancel.is_cancelled()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Sleep in short slices so cancellation takes effect promptly.
    fn wait(&self, total: Duration) {
        let slice = Duration::from_millis(100);
        let until = Instant::now() + total;
        while Instant::now() < until && !self.expired() {
            std::thread::sleep(slice.min(until - Instant::now()));
        }
    }
}

impl Iterator for FixStream<'_> {
    type Item = LocationFix;

    fn next(&mut self) -> Option<LocationFix> {
        while !self.done && self.attempt < self.config.max_attempts {
            if self.expired() {
                self.done = true;
                return None;
            }
            if let Some(delay) = self.pending_delay.take() {
                self.wait(delay);
                if self.expired() {
                    self.done = true;
                    return None;
                }
            }

            self.attempt += 1;
            match self
                .sensor
                .one_fix(self.config.attempt_timeout, self.config.excellent_accuracy_m)
            {
                Ok(reading) => {
                    let fix = LocationFix {
                        latitude: reading.latitude,
                        longitude: reading.longitude,
                        accuracy_m: reading.accuracy_m,
                        captured_at: Utc::now(),
                        attempt: self.attempt,
                    };
                    debug!(
                        "attempt {}: fix ({:.5}, {:.5}) ±{:.0}m",
                        fix.attempt, fix.latitude, fix.longitude, fix.accuracy_m
                    );
                    if fix.accuracy_m < self.config.excellent_accuracy_m {
                        // Good enough; further sampling has diminishing value.
                        self.done = true;
                    } else {
                        self.pending_delay = Some(self.config.inter_attempt_delay);
                    }
                    return Some(fix);
                }
                Err(e) => {
                    warn!("attempt {}: sensor read failed: {}", self.attempt, e);
                    self.pending_delay = Some(self.config.failure_backoff);
                }
            }
        }
        None
    }
}

// ─── Sensor implementations ──────────────────────────────────────

/// A fixed coordinate pretending to be a sensor. Used when the caller
/// already knows where it is (CLI `--lat/--lon`, server query params).
#[derive(Debug, Clone, Copy)]
pub struct StaticSensor {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
}

impl SensorPort for StaticSensor {
    fn one_fix(&self, _timeout: Duration, _desired: f64) -> Result<SensorReading, GeoError> {
        Ok(SensorReading {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_m: self.accuracy_m,
        })
    }
}

/// Accuracy assigned to IP-derived fixes. City-level at best.
const IP_FIX_ACCURACY_M: f64 = 25_000.0;

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Coarse fix via IP geolocation, for machines without a positioning
/// sensor. One HTTP round-trip per read.
#[derive(Debug, Clone, Default)]
pub struct IpSensor;

impl SensorPort for IpSensor {
    fn one_fix(&self, timeout: Duration, _desired: f64) -> Result<SensorReading, GeoError> {
        let response = ureq::get("https://ipapi.co/json/")
            .set("User-Agent", crate::USER_AGENT)
            .timeout(timeout)
            .call()
            .map_err(|e| GeoError::Network(e.to_string()))?;

        let r: IpApiResult = response
            .into_json()
            .map_err(|e| GeoError::InvalidResponse(e.to_string()))?;

        let latitude = r
            .latitude
            .ok_or_else(|| GeoError::InvalidResponse("no latitude".into()))?;
        let longitude = r
            .longitude
            .ok_or_else(|| GeoError::InvalidResponse("no longitude".into()))?;

        Ok(SensorReading {
            latitude,
            longitude,
            accuracy_m: IP_FIX_ACCURACY_M,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Plays back a fixed script of readings/failures, one per attempt.
    struct ScriptedSensor {
        script: RefCell<Vec<Result<SensorReading, GeoError>>>,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Result<SensorReading, GeoError>>) -> Self {
            let mut script = script;
            script.reverse();
            Self { script: RefCell::new(script) }
        }
    }

    impl SensorPort for ScriptedSensor {
        fn one_fix(&self, _t: Duration, _d: f64) -> Result<SensorReading, GeoError> {
            self.script
                .borrow_mut()
                .pop()
                .unwrap_or(Err(GeoError::SensorUnavailable("script exhausted".into())))
        }
    }

    fn reading(lat: f64, lon: f64, acc: f64) -> Result<SensorReading, GeoError> {
        Ok(SensorReading { latitude: lat, longitude: lon, accuracy_m: acc })
    }

    fn fast_config(max_attempts: u32) -> SamplerConfig {
        SamplerConfig {
            max_attempts,
            excellent_accuracy_m: 5.0,
            attempt_timeout: Duration::from_millis(50),
            inter_attempt_delay: Duration::from_millis(1),
            failure_backoff: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_yields_in_attempt_order() {
        let sensor = ScriptedSensor::new(vec![
            reading(28.70, 77.10, 20.0),
            reading(28.71, 77.11, 15.0),
            reading(28.72, 77.12, 12.0),
        ]);
        let fixes: Vec<_> = FixStream::new(&sensor, fast_config(3)).collect();
        assert_eq!(fixes.len(), 3);
        assert_eq!(fixes[0].attempt, 1);
        assert_eq!(fixes[1].attempt, 2);
        assert_eq!(fixes[2].attempt, 3);
    }

    #[test]
    fn test_early_stop_on_excellent_accuracy() {
        let sensor = ScriptedSensor::new(vec![
            reading(28.70, 77.10, 3.0),
            reading(28.71, 77.11, 2.0),
        ]);
        let fixes: Vec<_> = FixStream::new(&sensor, fast_config(10)).collect();
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].accuracy_m, 3.0);
    }

    #[test]
    fn test_failed_attempts_are_retried() {
        let sensor = ScriptedSensor::new(vec![
            Err(GeoError::SensorUnavailable("warming up".into())),
            Err(GeoError::Network("request timed out".into())),
            reading(28.70, 77.10, 30.0),
        ]);
        let fixes: Vec<_> = FixStream::new(&sensor, fast_config(3)).collect();
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].attempt, 3);
    }

    #[test]
    fn test_all_attempts_fail_yields_empty() {
        let sensor = ScriptedSensor::new(vec![
            Err(GeoError::SensorUnavailable("no signal".into())),
            Err(GeoError::SensorUnavailable("no signal".into())),
        ]);
        let fixes: Vec<_> = FixStream::new(&sensor, fast_config(2)).collect();
        assert!(fixes.is_empty());
    }

    #[test]
    fn test_cancel_halts_without_discarding_yielded() {
        let sensor = ScriptedSensor::new(vec![
            reading(28.70, 77.10, 20.0),
            reading(28.71, 77.11, 15.0),
        ]);
        let cancel = CancelToken::new();
        let mut stream =
            FixStream::with_cancel(&sensor, fast_config(5), cancel.clone(), None);

        let first = stream.next().unwrap();
        assert_eq!(first.attempt, 1);
        cancel.cancel();
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_deadline_short_circuits() {
        let sensor = ScriptedSensor::new(vec![reading(28.70, 77.10, 20.0)]);
        let past = Instant::now() - Duration::from_secs(1);
        let mut stream =
            FixStream::with_cancel(&sensor, fast_config(5), CancelToken::new(), Some(past));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_static_sensor() {
        let sensor = StaticSensor { latitude: 30.64, longitude: 76.82, accuracy_m: 5.0 };
        let r = sensor.one_fix(Duration::from_secs(1), 5.0).unwrap();
        assert_eq!(r.latitude, 30.64);
        assert_eq!(r.accuracy_m, 5.0);
    }
}
