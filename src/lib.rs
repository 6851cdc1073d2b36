//! Pinpoint — location refinement and multi-provider address consensus.
//!
//! Turns noisy, intermittent position fixes into one best-estimate
//! coordinate with a quantified accuracy, then reverse-geocodes it
//! through several independent providers and reconciles their
//! disagreeing answers into a single address with a confidence tier.

pub mod address;
pub mod config;
pub mod geo;
pub mod server;
pub mod service;

/// Sent on every outbound HTTP call.
pub const USER_AGENT: &str = "Pinpoint/0.3 (location-consensus-engine)";

pub use address::{Confidence, ConsensusAddress};
pub use config::Config;
pub use geo::{CancelToken, LocationFix, RefinedLocation};
pub use service::{Resolution, ResolutionService, ResolveError, ResolveOptions};
