//! Configuration: provider registry, scoring tables, regional rules.
//!
//! Loaded once at startup from ~/.pinpoint/config.json (missing file means
//! built-in defaults) and treated as read-only for the life of the
//! process. Request paths only ever borrow it, so concurrent resolutions
//! need no locking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from a strict config load. The lenient [`Config::load_from`]
/// path logs these and falls back to defaults instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Read(#[from] io::Error),
    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One registered geocoding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Consumed, not managed: passed through to the provider's API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    8
}

impl ProviderSpec {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A lat/lon bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat)
            && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// A corrective rule for a region: when the reconciled sublocality matches
/// a known small town, provider data frequently mis-attributes it to a
/// larger neighbor; force the corrected city (and optionally district).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    /// Case-insensitive substring matched against the final sublocality.
    pub sublocality_matches: String,
    pub force_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_district: Option<String>,
}

/// Everything we know about one supported region. Scoring cross-checks and
/// corrective rules only fire for coordinates inside `bounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bounds: BoundingBox,
    /// Expected postal code length (digits) in this region.
    pub postal_digits: usize,
    /// Postal codes here start with one of these.
    #[serde(default)]
    pub postal_prefixes: Vec<String>,
    /// Known-good (city, district) pairs for cross-validation.
    #[serde(default)]
    pub city_district_pairs: Vec<(String, String)>,
    /// Ordered; first matching rule wins, at most one applies.
    #[serde(default)]
    pub corrections: Vec<Correction>,
}

/// Tunable score weights. Documented per region supported; the defaults
/// are the values the consensus rules were calibrated with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTable {
    /// Substrings that mark a sublocality as a real administrative unit.
    pub admin_unit_patterns: Vec<String>,
    /// Flat per-provider reliability bonus.
    pub provider_reliability: BTreeMap<String, i32>,
}

impl Default for ScoreTable {
    fn default() -> Self {
        let mut provider_reliability = BTreeMap::new();
        provider_reliability.insert("geoapify".to_string(), 3);
        provider_reliability.insert("nominatim".to_string(), 2);
        provider_reliability.insert("photon".to_string(), 2);
        provider_reliability.insert("bigdatacloud".to_string(), 1);
        Self {
            admin_unit_patterns: ["sector", "phase", "block", "colony", "nagar", "enclave"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            provider_reliability,
        }
    }
}

/// Process-wide configuration. Built once, never mutated at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub providers: Vec<ProviderSpec>,
    pub regions: Vec<Region>,
    #[serde(default)]
    pub scoring: ScoreTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderSpec {
                    name: "nominatim".into(),
                    enabled: true,
                    timeout_secs: 8,
                    api_key: None,
                },
                ProviderSpec {
                    name: "photon".into(),
                    enabled: true,
                    timeout_secs: 8,
                    api_key: None,
                },
                ProviderSpec {
                    name: "bigdatacloud".into(),
                    enabled: true,
                    timeout_secs: 8,
                    api_key: None,
                },
                // Keyed provider; stays registered but disabled until a key
                // is configured.
                ProviderSpec {
                    name: "geoapify".into(),
                    enabled: false,
                    timeout_secs: 8,
                    api_key: None,
                },
            ],
            regions: vec![tricity_region()],
            scoring: ScoreTable::default(),
        }
    }
}

/// The Chandigarh tricity belt — the worked example the regional rules
/// were calibrated against. Small satellite towns here are routinely
/// mis-attributed to Chandigarh or Mohali by raw provider data.
fn tricity_region() -> Region {
    Region {
        name: "punjab-tricity".into(),
        bounds: BoundingBox {
            min_lat: 30.40,
            max_lat: 30.90,
            min_lon: 76.50,
            max_lon: 77.10,
        },
        postal_digits: 6,
        postal_prefixes: vec!["140".into(), "160".into(), "134".into()],
        city_district_pairs: vec![
            ("Zirakpur".into(), "Mohali".into()),
            ("Mohali".into(), "Mohali".into()),
            ("Kharar".into(), "Mohali".into()),
            ("Dera Bassi".into(), "Mohali".into()),
            ("Chandigarh".into(), "Chandigarh".into()),
            ("Panchkula".into(), "Panchkula".into()),
        ],
        corrections: vec![
            Correction {
                sublocality_matches: "zirakpur".into(),
                force_city: "Zirakpur".into(),
                force_district: Some("Mohali".into()),
            },
            Correction {
                sublocality_matches: "dera bassi".into(),
                force_city: "Dera Bassi".into(),
                force_district: Some("Mohali".into()),
            },
        ],
    }
}

impl Config {
    /// Load from the default path, falling back to built-in defaults when
    /// the file is missing or unusable.
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Lenient load: a missing file quietly yields the defaults, while a
    /// file that exists but cannot be read or parsed is warned about
    /// before defaulting.
    pub fn load_from(path: PathBuf) -> Self {
        match Self::try_load(&path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Strict load for an explicitly supplied path. `Ok(None)` means the
    /// file does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pinpoint")
            .join("config.json")
    }

    /// Providers that will actually be queried.
    pub fn enabled_providers(&self) -> Vec<&ProviderSpec> {
        self.providers.iter().filter(|p| p.enabled).collect()
    }

    /// The first region whose bounding box contains the coordinate.
    pub fn region_for(&self, lat: f64, lon: f64) -> Option<&Region> {
        self.regions.iter().find(|r| r.bounds.contains(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_has_keyless_providers_enabled() {
        let cfg = Config::default();
        let enabled: Vec<_> = cfg.enabled_providers().iter().map(|p| p.name.clone()).collect();
        assert_eq!(enabled, vec!["nominatim", "photon", "bigdatacloud"]);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_from(dir.path().join("nope.json"));
        assert_eq!(cfg.providers.len(), 4);
        assert_eq!(cfg.regions.len(), 1);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let cfg = Config::load_from(path.clone());
        assert_eq!(cfg.providers.len(), Config::default().providers.len());
        assert!(matches!(Config::try_load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_try_load_distinguishes_missing_from_broken() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Config::try_load(&dir.path().join("nope.json")), Ok(None)));

        let path = dir.path().join("config.json");
        fs::write(&path, "[]").unwrap();
        assert!(Config::try_load(&path).is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut cfg = Config::default();
        cfg.providers[3].enabled = true;
        cfg.providers[3].api_key = Some("k-123".into());
        fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();

        let loaded = Config::load_from(path);
        assert_eq!(loaded.providers[3].name, "geoapify");
        assert!(loaded.providers[3].enabled);
        assert_eq!(loaded.providers[3].api_key.as_deref(), Some("k-123"));
        assert_eq!(loaded.regions[0].name, "punjab-tricity");
    }

    #[test]
    fn test_partial_file_uses_serde_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "providers": [ { "name": "nominatim" } ], "regions": [] }"#,
        )
        .unwrap();

        let cfg = Config::load_from(path);
        assert_eq!(cfg.providers.len(), 1);
        assert!(cfg.providers[0].enabled);
        assert_eq!(cfg.providers[0].timeout_secs, 8);
        assert!(!cfg.scoring.admin_unit_patterns.is_empty());
    }

    #[test]
    fn test_bounding_box_contains() {
        let cfg = Config::default();
        assert!(cfg.region_for(30.6425, 76.8173).is_some()); // Zirakpur
        assert!(cfg.region_for(28.61, 77.21).is_none()); // Delhi
    }
}
