//! Core types for the address subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Placeholder written into every field of a consensus result when no
/// provider could supply an address. Distinct from an absent field, which
/// means "provider did not say".
pub const ADDRESS_UNAVAILABLE: &str = "address unavailable";

/// How much independent corroboration backs a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A provider's own rough claim about its result quality. Breaks score
/// ties when picking the base candidate, never trusted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderHint {
    Low,
    Medium,
    High,
}

/// One provider's normalized answer for a coordinate.
///
/// Every address field is optional: `None` means the provider did not
/// supply it. A candidate with `raw_error` set is a typed failure and
/// carries no address data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub formatted_address: Option<String>,
    pub building: Option<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub sublocality: Option<String>,
    pub area: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub provider: String,
    pub hint: ProviderHint,
    /// True when the leading name refers to an establishment/POI rather
    /// than a plain street address.
    pub is_poi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
}

impl AddressCandidate {
    /// Typed failure candidate: the provider was asked and could not answer.
    pub fn failed(provider: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            formatted_address: None,
            building: None,
            house_number: None,
            street: None,
            sublocality: None,
            area: None,
            city: None,
            district: None,
            state: None,
            country: None,
            postal_code: None,
            provider: provider.into(),
            hint: ProviderHint::Low,
            is_poi: false,
            raw_error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.raw_error.is_none()
    }
}

/// The reconciled address, with an audit trail of who contributed what.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusAddress {
    pub formatted_address: Option<String>,
    pub building: Option<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub sublocality: Option<String>,
    pub area: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub confidence: Confidence,
    pub contributing_providers: Vec<String>,
    /// field name -> provider (or regional rule) that supplied the value.
    pub field_provenance: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsensusAddress {
    /// The no-answer result: every field carries the explicit unavailable
    /// sentinel, confidence is low, `error` explains why.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let sentinel = Some(ADDRESS_UNAVAILABLE.to_string());
        Self {
            formatted_address: sentinel.clone(),
            building: sentinel.clone(),
            house_number: sentinel.clone(),
            street: sentinel.clone(),
            sublocality: sentinel.clone(),
            area: sentinel.clone(),
            city: sentinel.clone(),
            district: sentinel.clone(),
            state: sentinel.clone(),
            country: sentinel.clone(),
            postal_code: sentinel,
            confidence: Confidence::Low,
            contributing_providers: Vec::new(),
            field_provenance: BTreeMap::new(),
            error: Some(reason.into()),
        }
    }
}

/// Address lookup errors. Per-provider and expected; one provider failing
/// never aborts the batch.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
    #[error("provider returned no address for this coordinate")]
    Empty,
}
