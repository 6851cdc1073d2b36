//! Consensus resolution — one answer from several disagreeing candidates.
//!
//! The best-scored candidate supplies the structure (building, street,
//! house number); majority vote on free-text street names is unreliable,
//! so those are trusted as-is. The identity fields (sublocality, city,
//! district, postal code) are put to a vote across all surviving
//! candidates, then region-specific corrective rules run, then the
//! confidence tier is assigned. Commutative over candidate order.

use super::score::score;
use super::types::{AddressCandidate, Confidence, ConsensusAddress};
use crate::config::Config;
use log::debug;
use std::collections::BTreeMap;

/// Reconcile the candidate set for a coordinate into one address.
pub fn resolve(candidates: &[AddressCandidate], lat: f64, lon: f64, config: &Config) -> ConsensusAddress {
    // Sort by provider name up front so every later step is independent of
    // arrival order.
    let mut surviving: Vec<&AddressCandidate> =
        candidates.iter().filter(|c| c.is_ok()).collect();
    surviving.sort_by(|a, b| a.provider.cmp(&b.provider));

    if surviving.is_empty() {
        return ConsensusAddress::unavailable("no provider returned a usable address");
    }

    // Highest score wins the structural base; the provider's own quality
    // hint breaks score ties, then the name settles exact ones.
    let base: &AddressCandidate = surviving
        .iter()
        .max_by_key(|c| (score(c, lat, lon, config), c.hint, std::cmp::Reverse(c.provider.as_str())))
        .copied()
        .unwrap_or(surviving[0]);
    debug!("consensus base: {} (score {})", base.provider, score(base, lat, lon, config));

    let mut provenance: BTreeMap<String, String> = BTreeMap::new();
    let mut record = |field: &str, value: &Option<String>, from: &str| {
        if value.is_some() {
            provenance.insert(field.to_string(), from.to_string());
        }
    };

    record("formatted_address", &base.formatted_address, &base.provider);
    record("building", &base.building, &base.provider);
    record("house_number", &base.house_number, &base.provider);
    record("street", &base.street, &base.provider);
    record("area", &base.area, &base.provider);
    record("state", &base.state, &base.provider);
    record("country", &base.country, &base.provider);

    let mut sublocality = base.sublocality.clone();
    let mut city = base.city.clone();
    let mut district = base.district.clone();
    let mut postal_code = base.postal_code.clone();

    let identity: [(&str, &mut Option<String>, fn(&AddressCandidate) -> Option<&String>); 4] = [
        ("sublocality", &mut sublocality, |c| c.sublocality.as_ref()),
        ("city", &mut city, |c| c.city.as_ref()),
        ("district", &mut district, |c| c.district.as_ref()),
        ("postal_code", &mut postal_code, |c| c.postal_code.as_ref()),
    ];

    for (name, slot, get) in identity {
        let mut from = base.provider.as_str();
        if let Some(winner) = majority(&surviving, get) {
            let differs = slot
                .as_deref()
                .map_or(true, |cur| !cur.eq_ignore_ascii_case(&winner.value));
            if differs {
                *slot = Some(winner.value);
                from = winner.provider;
            }
        }
        if slot.is_some() {
            provenance.insert(name.to_string(), from.to_string());
        }
    }

    // Confidence is judged on the post-vote values, before corrections.
    // Two corroborating sources are enough for high; agreement need not
    // cover a majority of the surviving set.
    let agreement = |final_value: &Option<String>, get: fn(&AddressCandidate) -> Option<&String>| {
        let Some(v) = final_value else { return 0 };
        surviving
            .iter()
            .filter(|c| get(c).is_some_and(|s| s.eq_ignore_ascii_case(v)))
            .count()
    };
    let corroborated = agreement(&sublocality, |c| c.sublocality.as_ref()) >= 2
        && agreement(&city, |c| c.city.as_ref()) >= 2
        && agreement(&postal_code, |c| c.postal_code.as_ref()) >= 2;
    let confidence = if surviving.len() >= 3 && corroborated {
        Confidence::High
    } else if surviving.len() >= 2 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    // Regional corrective rules: first match wins, at most one applies.
    if let Some(region) = config.region_for(lat, lon) {
        let sub_lower = sublocality.as_deref().map(str::to_lowercase);
        if let Some(rule) = region.corrections.iter().find(|r| {
            sub_lower
                .as_deref()
                .is_some_and(|s| s.contains(&r.sublocality_matches.to_lowercase()))
        }) {
            let rule_tag = format!("rule:{}", region.name);
            debug!("applying correction for '{}' in {}", rule.sublocality_matches, region.name);
            city = Some(rule.force_city.clone());
            provenance.insert("city".to_string(), rule_tag.clone());
            if let Some(d) = &rule.force_district {
                district = Some(d.clone());
                provenance.insert("district".to_string(), rule_tag);
            }
        }
    }

    ConsensusAddress {
        formatted_address: base.formatted_address.clone(),
        building: base.building.clone(),
        house_number: base.house_number.clone(),
        street: base.street.clone(),
        sublocality,
        area: base.area.clone(),
        city,
        district,
        state: base.state.clone(),
        country: base.country.clone(),
        postal_code,
        confidence,
        contributing_providers: surviving.iter().map(|c| c.provider.clone()).collect(),
        field_provenance: provenance,
        error: None,
    }
}

struct MajorityWinner<'a> {
    value: String,
    provider: &'a str,
}

/// The strictly most frequent normalized value for one field, with at
/// least two agreeing sources. Ties yield `None` (caller keeps the base).
fn majority<'a>(
    surviving: &[&'a AddressCandidate],
    get: fn(&AddressCandidate) -> Option<&String>,
) -> Option<MajorityWinner<'a>> {
    // keyed by lowercase value; keeps the first-seen spelling/provider,
    // which is deterministic because `surviving` is name-sorted.
    let mut tally: BTreeMap<String, (usize, &str, &str)> = BTreeMap::new();
    for c in surviving {
        if let Some(v) = get(c) {
            let entry = tally
                .entry(v.to_lowercase())
                .or_insert((0, v.as_str(), c.provider.as_str()));
            entry.0 += 1;
        }
    }

    let max = tally.values().map(|(n, _, _)| *n).max()?;
    if max < 2 {
        return None;
    }
    let mut at_max = tally.values().filter(|(n, _, _)| *n == max);
    let &(_, value, provider) = at_max.next()?;
    if at_max.next().is_some() {
        return None; // tie between distinct values
    }
    Some(MajorityWinner { value: value.to_string(), provider })
}
