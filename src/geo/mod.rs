//! Positioning subsystem: raw fix acquisition and refinement.
//!
//! A [`sampler::FixStream`] lazily pulls [`types::LocationFix`] readings
//! from a [`sampler::SensorPort`]; [`refiner::refine`] folds whatever was
//! collected into one best-estimate coordinate.

pub mod refiner;
pub mod sampler;
pub mod types;

pub use refiner::refine;
pub use sampler::{CancelToken, FixStream, IpSensor, SamplerConfig, SensorPort, StaticSensor};
pub use types::{GeoError, LocationFix, RefinedLocation, SensorReading};
