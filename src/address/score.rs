//! Regional plausibility scoring.
//!
//! Deterministic, additive, side-effect free. The point values live in the
//! configuration tables ([`crate::config::ScoreTable`] and per-region
//! data), so supporting a new geography is a config change, not code.

use super::types::AddressCandidate;
use crate::config::{Config, Region};

/// Score one candidate's plausibility for the given coordinate. Higher is
/// more trustworthy; failure candidates should not be scored.
pub fn score(candidate: &AddressCandidate, lat: f64, lon: f64, config: &Config) -> i32 {
    let mut points = 0;
    let region = config.region_for(lat, lon);

    if candidate.building.is_some() {
        points += 4;
    }
    if candidate.street.is_some() {
        points += 3;
    }
    if candidate.house_number.is_some() {
        points += 2;
    }

    // A sublocality that differs from the city is real granularity; a
    // collapsed locality repeats the city name.
    if let Some(sub) = &candidate.sublocality {
        let collapsed = candidate
            .city
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(sub));
        if !collapsed {
            points += 5;
        }
        let sub_lower = sub.to_lowercase();
        if config
            .scoring
            .admin_unit_patterns
            .iter()
            .any(|p| sub_lower.contains(p.as_str()))
        {
            points += 3;
        }
    }

    if let Some(region) = region {
        points += pair_points(candidate, region);
        points += postal_points(candidate, region);
    } else if candidate.postal_code.is_some() {
        // Outside any known region we can only reward presence.
        points += 1;
    }

    points += formatted_points(candidate);
    points += config
        .scoring
        .provider_reliability
        .get(&candidate.provider)
        .copied()
        .unwrap_or(0);

    points
}

/// +3 when the candidate's (city, district) pair is a known-good pair for
/// the region; +2 when only the city appears in the table at all.
fn pair_points(candidate: &AddressCandidate, region: &Region) -> i32 {
    let (Some(city), Some(district)) = (&candidate.city, &candidate.district) else {
        if let Some(city) = &candidate.city {
            if region
                .city_district_pairs
                .iter()
                .any(|(c, _)| c.eq_ignore_ascii_case(city))
            {
                return 2;
            }
        }
        return 0;
    };
    if region
        .city_district_pairs
        .iter()
        .any(|(c, d)| c.eq_ignore_ascii_case(city) && d.eq_ignore_ascii_case(district))
    {
        3
    } else if region
        .city_district_pairs
        .iter()
        .any(|(c, _)| c.eq_ignore_ascii_case(city))
    {
        2
    } else {
        0
    }
}

/// +1 presence, +1 expected digit count, +1 regional prefix match.
fn postal_points(candidate: &AddressCandidate, region: &Region) -> i32 {
    let Some(postal) = &candidate.postal_code else {
        return 0;
    };
    let mut points = 1;
    let digits_ok =
        postal.len() == region.postal_digits && postal.chars().all(|c| c.is_ascii_digit());
    if digits_ok {
        points += 1;
        if region.postal_prefixes.iter().any(|p| postal.starts_with(p.as_str())) {
            points += 1;
        }
    }
    points
}

/// +2 for a rich formatted address, +1 for a modest one.
fn formatted_points(candidate: &AddressCandidate) -> i32 {
    match &candidate.formatted_address {
        Some(f) if f.len() > 40 => 2,
        Some(f) if f.len() > 20 => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::types::ProviderHint;
    use crate::config::Config;

    // Inside the default tricity region.
    const LAT: f64 = 30.6425;
    const LON: f64 = 76.8173;

    fn blank(provider: &str) -> AddressCandidate {
        AddressCandidate {
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
            hint: ProviderHint::Medium,
            is_poi: false,
            raw_error: None,
        }
    }

    #[test]
    fn test_empty_candidate_scores_only_reliability() {
        let cfg = Config::default();
        assert_eq!(score(&blank("nominatim"), LAT, LON, &cfg), 2);
        assert_eq!(score(&blank("unlisted"), LAT, LON, &cfg), 0);
    }

    #[test]
    fn test_structural_fields_add_up() {
        let cfg = Config::default();
        let mut c = blank("unlisted");
        c.building = Some("Gupta Sweets".into());
        c.street = Some("VIP Road".into());
        c.house_number = Some("221".into());
        assert_eq!(score(&c, LAT, LON, &cfg), 4 + 3 + 2);
    }

    #[test]
    fn test_granular_sublocality_beats_collapsed() {
        let cfg = Config::default();
        let mut granular = blank("unlisted");
        granular.sublocality = Some("Baltana".into());
        granular.city = Some("Zirakpur".into());

        let mut collapsed = blank("unlisted");
        collapsed.sublocality = Some("Zirakpur".into());
        collapsed.city = Some("Zirakpur".into());

        assert!(score(&granular, LAT, LON, &cfg) > score(&collapsed, LAT, LON, &cfg));
    }

    #[test]
    fn test_admin_unit_pattern_bonus() {
        let cfg = Config::default();
        let mut c = blank("unlisted");
        c.sublocality = Some("Sector 20".into());
        c.city = Some("Panchkula".into());
        // +5 granularity, +3 pattern, +2 city-in-table
        assert_eq!(score(&c, LAT, LON, &cfg), 10);
    }

    #[test]
    fn test_known_city_district_pair() {
        let cfg = Config::default();
        let mut good = blank("unlisted");
        good.city = Some("Zirakpur".into());
        good.district = Some("Mohali".into());

        let mut odd = blank("unlisted");
        odd.city = Some("Zirakpur".into());
        odd.district = Some("Ambala".into());

        assert_eq!(score(&good, LAT, LON, &cfg), 3);
        assert_eq!(score(&odd, LAT, LON, &cfg), 2);
    }

    #[test]
    fn test_postal_scoring_tiers() {
        let cfg = Config::default();

        let mut present = blank("unlisted");
        present.postal_code = Some("SW1A 1AA".into());
        assert_eq!(score(&present, LAT, LON, &cfg), 1);

        let mut valid = blank("unlisted");
        valid.postal_code = Some("110001".into());
        assert_eq!(score(&valid, LAT, LON, &cfg), 2);

        let mut regional = blank("unlisted");
        regional.postal_code = Some("140603".into());
        assert_eq!(score(&regional, LAT, LON, &cfg), 3);
    }

    #[test]
    fn test_postal_outside_known_region_presence_only() {
        let cfg = Config::default();
        let mut c = blank("unlisted");
        c.postal_code = Some("140603".into());
        // Delhi coordinate: no region table applies.
        assert_eq!(score(&c, 28.61, 77.21, &cfg), 1);
    }

    #[test]
    fn test_formatted_length_bonus() {
        let cfg = Config::default();
        let mut c = blank("unlisted");
        c.formatted_address = Some("Short one".into());
        assert_eq!(score(&c, LAT, LON, &cfg), 0);
        c.formatted_address = Some("Gupta Sweets, VIP Road".into());
        assert_eq!(score(&c, LAT, LON, &cfg), 1);
        c.formatted_address =
            Some("Gupta Sweets, VIP Road, Baltana, Zirakpur, Punjab 140603".into());
        assert_eq!(score(&c, LAT, LON, &cfg), 2);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let cfg = Config::default();
        let mut c = blank("nominatim");
        c.city = Some("Zirakpur".into());
        c.district = Some("Mohali".into());
        c.postal_code = Some("140603".into());
        let first = score(&c, LAT, LON, &cfg);
        assert_eq!(first, score(&c, LAT, LON, &cfg));
    }
}
