//! Address normalization — provider wire fields to the canonical candidate.
//!
//! Pure and idempotent: running a normalized candidate's fields back
//! through `normalize` changes nothing. Missing or unparseable fields stay
//! absent; nothing is defaulted to an empty string.

use super::types::{AddressCandidate, ProviderHint};

/// Field bundle as close to a provider's wire shape as the clients hand it
/// over. Synonym slots (quarter/neighbourhood/suburb, town/village, county)
/// exist so each client can fill what its API actually names.
#[derive(Debug, Clone, Default)]
pub struct RawAddress {
    pub display_name: Option<String>,
    /// Explicit establishment/POI tag (amenity, shop, office...).
    pub poi: Option<String>,
    /// Premise/building tag, which may just repeat the house number.
    pub premise: Option<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub sublocality: Option<String>,
    pub quarter: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub locality: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// Trim and collapse internal whitespace. Empty after cleaning means absent.
fn clean(s: Option<String>) -> Option<String> {
    let s = s?;
    let cleaned = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn first_present(slots: Vec<Option<String>>) -> Option<String> {
    slots.into_iter().flatten().next()
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Map one provider's raw fields into the canonical candidate shape.
pub fn normalize(raw: RawAddress, provider: &str, hint: ProviderHint) -> AddressCandidate {
    let display_name = clean(raw.display_name);
    let house_number = clean(raw.house_number);
    let street = clean(raw.street);

    // Synonym collapse: all the neighbourhood-ish slots feed sublocality,
    // the settlement-ish slots feed city.
    let sublocality = first_present(vec![
        clean(raw.sublocality),
        clean(raw.quarter),
        clean(raw.neighbourhood),
        clean(raw.suburb),
    ]);
    let area = clean(raw.locality);
    let city = first_present(vec![clean(raw.city), clean(raw.town), clean(raw.village)]);
    let district = first_present(vec![clean(raw.district), clean(raw.county)]);

    // Building detection, in priority order: an explicit POI tag, then a
    // premise tag that is not just the house number again, then the
    // display name's leading segment when it is neither a number nor the
    // street repeated.
    let poi = clean(raw.poi);
    let premise = clean(raw.premise);
    let mut is_poi = false;
    let building = if let Some(p) = poi {
        is_poi = true;
        Some(p)
    } else if let Some(p) = premise.filter(|p| {
        house_number.as_deref().map_or(true, |h| !eq_ignore_case(p, h))
    }) {
        Some(p)
    } else {
        display_name
            .as_deref()
            .and_then(|d| d.split(',').next())
            .map(str::trim)
            .filter(|seg| {
                !seg.is_empty()
                    && !seg.starts_with(|c: char| c.is_ascii_digit())
                    && street.as_deref().map_or(true, |s| !eq_ignore_case(seg, s))
            })
            .map(str::to_string)
    };

    AddressCandidate {
        formatted_address: display_name,
        building,
        house_number,
        street,
        sublocality,
        area,
        city,
        district,
        state: clean(raw.state),
        country: clean(raw.country),
        postal_code: clean(raw.postal_code),
        provider: provider.to_string(),
        hint,
        is_poi,
        raw_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawAddress {
        RawAddress::default()
    }

    #[test]
    fn test_whitespace_trimmed_and_collapsed() {
        let c = normalize(
            RawAddress {
                city: Some("  Zirakpur   ".into()),
                street: Some("Patiala  Chowk   Road".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert_eq!(c.city.as_deref(), Some("Zirakpur"));
        assert_eq!(c.street.as_deref(), Some("Patiala Chowk Road"));
    }

    #[test]
    fn test_empty_string_becomes_absent() {
        let c = normalize(
            RawAddress { postal_code: Some("   ".into()), ..raw() },
            "test",
            ProviderHint::Medium,
        );
        assert!(c.postal_code.is_none());
    }

    #[test]
    fn test_sublocality_synonyms_collapse() {
        let c = normalize(
            RawAddress { neighbourhood: Some("Sector 20".into()), ..raw() },
            "test",
            ProviderHint::Medium,
        );
        assert_eq!(c.sublocality.as_deref(), Some("Sector 20"));

        let c = normalize(
            RawAddress { quarter: Some("Phase 7".into()), suburb: Some("Mohali".into()), ..raw() },
            "test",
            ProviderHint::Medium,
        );
        // quarter outranks suburb
        assert_eq!(c.sublocality.as_deref(), Some("Phase 7"));
    }

    #[test]
    fn test_town_and_village_feed_city() {
        let c = normalize(
            RawAddress { village: Some("Dera Bassi".into()), ..raw() },
            "test",
            ProviderHint::Medium,
        );
        assert_eq!(c.city.as_deref(), Some("Dera Bassi"));
    }

    #[test]
    fn test_explicit_poi_wins() {
        let c = normalize(
            RawAddress {
                poi: Some("Paras Downtown Mall".into()),
                premise: Some("Tower B".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert_eq!(c.building.as_deref(), Some("Paras Downtown Mall"));
        assert!(c.is_poi);
    }

    #[test]
    fn test_premise_matching_house_number_is_not_a_building() {
        let c = normalize(
            RawAddress {
                premise: Some("221".into()),
                house_number: Some("221".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert!(c.building.is_none());
        assert!(!c.is_poi);
    }

    #[test]
    fn test_display_name_segment_as_building() {
        let c = normalize(
            RawAddress {
                display_name: Some("Gupta Sweets, VIP Road, Zirakpur".into()),
                street: Some("VIP Road".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert_eq!(c.building.as_deref(), Some("Gupta Sweets"));
        assert!(!c.is_poi);
    }

    #[test]
    fn test_display_name_segment_rejected_when_numeric_or_street() {
        let c = normalize(
            RawAddress {
                display_name: Some("221, VIP Road, Zirakpur".into()),
                street: Some("VIP Road".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert!(c.building.is_none());

        let c = normalize(
            RawAddress {
                display_name: Some("VIP Road, Zirakpur".into()),
                street: Some("VIP Road".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );
        assert!(c.building.is_none());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = normalize(
            RawAddress {
                display_name: Some("  Gupta Sweets , VIP Road, Zirakpur ".into()),
                neighbourhood: Some("Sector  20".into()),
                town: Some("Zirakpur".into()),
                county: Some("Mohali".into()),
                postal_code: Some("140603".into()),
                street: Some("VIP Road".into()),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );

        // Re-wrap the canonical output as raw input.
        let second = normalize(
            RawAddress {
                display_name: first.formatted_address.clone(),
                poi: first.building.clone().filter(|_| first.is_poi),
                premise: first.building.clone().filter(|_| !first.is_poi),
                house_number: first.house_number.clone(),
                street: first.street.clone(),
                sublocality: first.sublocality.clone(),
                locality: first.area.clone(),
                city: first.city.clone(),
                district: first.district.clone(),
                state: first.state.clone(),
                country: first.country.clone(),
                postal_code: first.postal_code.clone(),
                ..raw()
            },
            "test",
            ProviderHint::Medium,
        );

        assert_eq!(second.formatted_address, first.formatted_address);
        assert_eq!(second.building, first.building);
        assert_eq!(second.sublocality, first.sublocality);
        assert_eq!(second.city, first.city);
        assert_eq!(second.district, first.district);
        assert_eq!(second.postal_code, first.postal_code);
    }
}
