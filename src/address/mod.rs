//! Address subsystem: multi-provider reverse geocoding and consensus.
//!
//! The [`orchestrator::Orchestrator`] fans a coordinate out to every
//! enabled [`providers::ProviderClient`], each answer is normalized into a
//! canonical [`types::AddressCandidate`], and [`consensus::resolve`]
//! reconciles the disagreeing set into one [`types::ConsensusAddress`]
//! with a confidence tier and per-field provenance.

pub mod consensus;
pub mod normalize;
pub mod orchestrator;
pub mod providers;
pub mod score;
pub mod types;

pub use orchestrator::Orchestrator;
pub use providers::ProviderClient;
pub use types::{AddressCandidate, AddressError, Confidence, ConsensusAddress, ProviderHint};
