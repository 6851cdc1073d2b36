//! Fan-out/fan-in over the enabled providers.
//!
//! One thread per enabled provider, each bounded by that provider's own
//! HTTP timeout. A provider that fails or times out becomes a typed
//! failure candidate; it never blocks or fails the others. No retries
//! here — retry policy belongs to the individual client if anywhere.

use super::providers::{build_clients, ProviderClient};
use super::types::AddressCandidate;
use crate::config::Config;
use log::debug;

pub struct Orchestrator {
    clients: Vec<Box<dyn ProviderClient>>,
}

impl Orchestrator {
    pub fn new(clients: Vec<Box<dyn ProviderClient>>) -> Self {
        Self { clients }
    }

    /// Build from the registry's enabled providers.
    pub fn from_config(config: &Config) -> Self {
        Self::new(build_clients(&config.enabled_providers()))
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Query every provider concurrently and return all results, successes
    /// and typed failures alike. Result order carries no meaning; the
    /// consensus step is order-independent.
    pub fn collect(&self, lat: f64, lon: f64) -> Vec<AddressCandidate> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .clients
                .iter()
                .map(|client| {
                    let name = client.name().to_string();
                    let handle = scope.spawn(move || match client.resolve(lat, lon) {
                        Ok(candidate) => candidate,
                        Err(e) => AddressCandidate::failed(client.name(), e),
                    });
                    (name, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| AddressCandidate::failed(&name, "provider task panicked"))
                })
                .inspect(|c| {
                    debug!(
                        "provider {}: {}",
                        c.provider,
                        c.raw_error.as_deref().unwrap_or("ok")
                    )
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::types::{AddressError, ProviderHint};
    use crate::address::normalize::{normalize, RawAddress};

    struct FakeProvider {
        name: &'static str,
        city: Option<&'static str>,
        fail: bool,
    }

    impl ProviderClient for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn resolve(&self, _lat: f64, _lon: f64) -> Result<AddressCandidate, AddressError> {
            if self.fail {
                return Err(AddressError::Network("connection reset".into()));
            }
            Ok(normalize(
                RawAddress {
                    city: self.city.map(str::to_string),
                    ..RawAddress::default()
                },
                self.name,
                ProviderHint::Medium,
            ))
        }
    }

    struct PanickingProvider;

    impl ProviderClient for PanickingProvider {
        fn name(&self) -> &str {
            "boom"
        }

        fn resolve(&self, _lat: f64, _lon: f64) -> Result<AddressCandidate, AddressError> {
            panic!("bug in provider");
        }
    }

    #[test]
    fn test_one_failure_does_not_block_the_batch() {
        let orch = Orchestrator::new(vec![
            Box::new(FakeProvider { name: "a", city: Some("Zirakpur"), fail: false }),
            Box::new(FakeProvider { name: "b", city: None, fail: true }),
            Box::new(FakeProvider { name: "c", city: Some("Zirakpur"), fail: false }),
        ]);
        let results = orch.collect(30.64, 76.82);
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|c| c.is_ok()).count(), 2);
        let failed = results.iter().find(|c| !c.is_ok()).unwrap();
        assert_eq!(failed.provider, "b");
        assert!(failed.raw_error.as_deref().unwrap().contains("connection reset"));
    }

    #[test]
    fn test_all_failures_still_return_full_set() {
        let orch = Orchestrator::new(vec![
            Box::new(FakeProvider { name: "a", city: None, fail: true }),
            Box::new(FakeProvider { name: "b", city: None, fail: true }),
        ]);
        let results = orch.collect(30.64, 76.82);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| !c.is_ok()));
    }

    #[test]
    fn test_panicking_provider_becomes_typed_failure() {
        let orch = Orchestrator::new(vec![
            Box::new(PanickingProvider),
            Box::new(FakeProvider { name: "ok", city: Some("Mohali"), fail: false }),
        ]);
        let results = orch.collect(30.64, 76.82);
        assert_eq!(results.len(), 2);
        let boom = results.iter().find(|c| c.provider == "boom").unwrap();
        assert!(boom.raw_error.as_deref().unwrap().contains("panicked"));
    }

    #[test]
    fn test_empty_registry_collects_nothing() {
        let orch = Orchestrator::new(vec![]);
        assert!(orch.is_empty());
        assert!(orch.collect(30.64, 76.82).is_empty());
    }
}
