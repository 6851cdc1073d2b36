//! Provider clients: one blocking HTTP client per reverse-geocoding service.
//!
//! Each client owns a serde struct matching its wire shape and maps it into
//! the shared [`RawAddress`] bundle for the normalizer. Transport and parse
//! failures surface as [`AddressError`]; the orchestrator turns those into
//! typed failure candidates.

use super::normalize::{normalize, RawAddress};
use super::types::{AddressCandidate, AddressError, ProviderHint};
use crate::config::ProviderSpec;
use serde::Deserialize;
use std::time::Duration;

/// One external reverse-geocoding service.
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;
    fn resolve(&self, lat: f64, lon: f64) -> Result<AddressCandidate, AddressError>;
}

fn get_json<T: serde::de::DeserializeOwned>(url: &str, timeout: Duration) -> Result<T, AddressError> {
    ureq::get(url)
        .set("User-Agent", crate::USER_AGENT)
        .timeout(timeout)
        .call()
        .map_err(|e| AddressError::Network(e.to_string()))?
        .into_json()
        .map_err(|e| AddressError::InvalidResponse(e.to_string()))
}

/// Build clients for every enabled provider in the registry. Unknown names
/// are skipped with a warning so a stale config file cannot take the whole
/// registry down.
pub fn build_clients(specs: &[&ProviderSpec]) -> Vec<Box<dyn ProviderClient>> {
    let mut clients: Vec<Box<dyn ProviderClient>> = Vec::new();
    for spec in specs {
        match spec.name.as_str() {
            "nominatim" => clients.push(Box::new(Nominatim { timeout: spec.timeout() })),
            "photon" => clients.push(Box::new(Photon { timeout: spec.timeout() })),
            "bigdatacloud" => clients.push(Box::new(BigDataCloud { timeout: spec.timeout() })),
            "geoapify" => match &spec.api_key {
                Some(key) => clients.push(Box::new(Geoapify {
                    timeout: spec.timeout(),
                    api_key: key.clone(),
                })),
                None => log::warn!("geoapify enabled without an api key; skipping"),
            },
            other => log::warn!("unknown provider '{}' in registry; skipping", other),
        }
    }
    clients
}

// ─── Nominatim (OpenStreetMap) ───────────────────────────────────

#[derive(Deserialize, Default)]
struct NominatimAddress {
    #[serde(default)]
    amenity: Option<String>,
    #[serde(default)]
    shop: Option<String>,
    #[serde(default)]
    building: Option<String>,
    #[serde(default)]
    house_number: Option<String>,
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    neighbourhood: Option<String>,
    #[serde(default)]
    quarter: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    state_district: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

#[derive(Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
    /// Nominatim reports "Unable to geocode" here with HTTP 200.
    #[serde(default)]
    error: Option<String>,
}

pub struct Nominatim {
    timeout: Duration,
}

impl ProviderClient for Nominatim {
    fn name(&self) -> &str {
        "nominatim"
    }

    fn resolve(&self, lat: f64, lon: f64) -> Result<AddressCandidate, AddressError> {
        let url = format!(
            "https://nominatim.openstreetmap.org/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1",
            lat, lon
        );
        let r: NominatimReverse = get_json(&url, self.timeout)?;
        if let Some(e) = r.error {
            return Err(AddressError::InvalidResponse(e));
        }
        let a = r.address.unwrap_or_default();
        Ok(normalize(
            RawAddress {
                display_name: r.display_name,
                poi: a.amenity.or(a.shop),
                premise: a.building,
                house_number: a.house_number,
                street: a.road,
                neighbourhood: a.neighbourhood,
                quarter: a.quarter,
                suburb: a.suburb,
                city: a.city,
                town: a.town,
                village: a.village,
                district: a.state_district,
                county: a.county,
                state: a.state,
                country: a.country,
                postal_code: a.postcode,
                ..RawAddress::default()
            },
            self.name(),
            ProviderHint::Medium,
        ))
    }
}

// ─── Photon (komoot) ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct PhotonProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    osm_key: Option<String>,
    #[serde(default)]
    housenumber: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

#[derive(Deserialize)]
struct PhotonFeature {
    properties: PhotonProperties,
}

#[derive(Deserialize)]
struct PhotonReverse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

/// osm_key values whose `name` is an establishment rather than a place
/// or road name.
const PHOTON_POI_KEYS: &[&str] = &["amenity", "shop", "tourism", "leisure", "office", "building"];

pub struct Photon {
    timeout: Duration,
}

impl ProviderClient for Photon {
    fn name(&self) -> &str {
        "photon"
    }

    fn resolve(&self, lat: f64, lon: f64) -> Result<AddressCandidate, AddressError> {
        let url = format!("https://photon.komoot.io/reverse?lat={}&lon={}", lat, lon);
        let r: PhotonReverse = get_json(&url, self.timeout)?;
        let p = r.features.into_iter().next().ok_or(AddressError::Empty)?.properties;

        let is_poi = p
            .osm_key
            .as_deref()
            .is_some_and(|k| PHOTON_POI_KEYS.contains(&k));
        // Photon's `district` is the neighbourhood, not the admin district.
        Ok(normalize(
            RawAddress {
                poi: p.name.clone().filter(|_| is_poi),
                premise: p.name.filter(|_| !is_poi),
                house_number: p.housenumber,
                street: p.street,
                sublocality: p.district,
                locality: p.locality,
                city: p.city,
                district: p.county,
                state: p.state,
                country: p.country,
                postal_code: p.postcode,
                ..RawAddress::default()
            },
            self.name(),
            ProviderHint::Medium,
        ))
    }
}

// ─── BigDataCloud ────────────────────────────────────────────────

#[derive(Deserialize)]
struct BigDataCloudReverse {
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, rename = "principalSubdivision")]
    principal_subdivision: Option<String>,
    #[serde(default, rename = "countryName")]
    country_name: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

pub struct BigDataCloud {
    timeout: Duration,
}

impl ProviderClient for BigDataCloud {
    fn name(&self) -> &str {
        "bigdatacloud"
    }

    fn resolve(&self, lat: f64, lon: f64) -> Result<AddressCandidate, AddressError> {
        let url = format!(
            "https://api.bigdatacloud.net/data/reverse-geocode-client?latitude={}&longitude={}&localityLanguage=en",
            lat, lon
        );
        let r: BigDataCloudReverse = get_json(&url, self.timeout)?;
        // Coarse provider: locality-level only, no street data.
        Ok(normalize(
            RawAddress {
                locality: r.locality,
                city: r.city,
                state: r.principal_subdivision,
                country: r.country_name,
                postal_code: r.postcode,
                ..RawAddress::default()
            },
            self.name(),
            ProviderHint::Low,
        ))
    }
}

// ─── Geoapify (keyed) ────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct GeoapifyProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted: Option<String>,
    #[serde(default)]
    housenumber: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
}

#[derive(Deserialize)]
struct GeoapifyFeature {
    properties: GeoapifyProperties,
}

#[derive(Deserialize)]
struct GeoapifyReverse {
    #[serde(default)]
    features: Vec<GeoapifyFeature>,
}

pub struct Geoapify {
    timeout: Duration,
    api_key: String,
}

impl ProviderClient for Geoapify {
    fn name(&self) -> &str {
        "geoapify"
    }

    fn resolve(&self, lat: f64, lon: f64) -> Result<AddressCandidate, AddressError> {
        let url = format!(
            "https://api.geoapify.com/v1/geocode/reverse?lat={}&lon={}&format=geojson&apiKey={}",
            lat, lon, self.api_key
        );
        let r: GeoapifyReverse = get_json(&url, self.timeout)?;
        let p = r.features.into_iter().next().ok_or(AddressError::Empty)?.properties;
        Ok(normalize(
            RawAddress {
                display_name: p.formatted,
                poi: p.name,
                house_number: p.housenumber,
                street: p.street,
                suburb: p.suburb,
                sublocality: p.district,
                city: p.city,
                district: p.county,
                state: p.state,
                country: p.country,
                postal_code: p.postcode,
                ..RawAddress::default()
            },
            self.name(),
            ProviderHint::High,
        ))
    }
}
