//! Extractor registry: owns live extractor instances keyed by
//! `{provider}:{service}`.
//!
//! Factories (the "extractor classes") are added once at startup;
//! [`register_provider`] then instantiates every factory of a provider
//! against every session entry handed in. Registration and
//! unregistration replace the provider's whole slice atomically, so readers
//! never observe a half-updated map.
//!
//! [`register_provider`]: ExtractorRegistry::register_provider

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::traits::extractor::{Extractor, ExtractorFactory};
use crate::traits::session::SessionEntry;
use crate::types::artifact::CloudProvider;
use crate::types::config::ExtractorSettings;

/// A live extractor instance plus its session binding.
#[derive(Clone)]
pub struct RegisteredExtractor {
    /// Registry key: `{provider}:{service}`.
    pub key: String,

    /// Provider component of the key.
    pub provider: CloudProvider,

    /// Service component of the key.
    pub service: String,

    /// Account the instance's session is bound to.
    pub account_id: String,

    /// Usable regions of the instance's session.
    pub regions: Vec<String>,

    /// The instance itself.
    pub extractor: Arc<dyn Extractor>,
}

impl fmt::Debug for RegisteredExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredExtractor")
            .field("key", &self.key)
            .field("account_id", &self.account_id)
            .field("regions", &self.regions)
            .finish()
    }
}

/// Everything guarded by the registry's single lock. Keeping extractors
/// and sessions in one struct makes register/unregister atomic with
/// respect to readers.
#[derive(Default)]
struct RegistryState {
    extractors: HashMap<String, RegisteredExtractor>,
    sessions: HashMap<CloudProvider, Vec<SessionEntry>>,
}

/// Registry of live extractor instances and provider sessions.
#[derive(Default)]
pub struct ExtractorRegistry {
    factories: RwLock<Vec<Arc<dyn ExtractorFactory>>>,
    settings: RwLock<HashMap<CloudProvider, ExtractorSettings>>,
    state: RwLock<RegistryState>,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory (builder form, for startup wiring).
    pub fn with_factory(self, factory: Arc<dyn ExtractorFactory>) -> Self {
        self.add_factory(factory);
        self
    }

    /// Set a provider's static extractor settings (builder form).
    pub fn with_settings(self, provider: CloudProvider, settings: ExtractorSettings) -> Self {
        self.settings.write().unwrap().insert(provider, settings);
        self
    }

    /// Add a factory at runtime.
    pub fn add_factory(&self, factory: Arc<dyn ExtractorFactory>) {
        self.factories.write().unwrap().push(factory);
    }

    /// Instantiate every factory of `provider` against every session
    /// entry and publish the results, replacing the provider's previous
    /// extractors and session collection.
    ///
    /// A factory that fails to build is logged and skipped; the rest of
    /// the registration proceeds. Returns the number of instances
    /// registered.
    pub fn register_provider(
        &self,
        provider: CloudProvider,
        sessions: Vec<SessionEntry>,
    ) -> usize {
        let factories: Vec<_> = self
            .factories
            .read()
            .unwrap()
            .iter()
            .filter(|f| f.provider() == provider)
            .cloned()
            .collect();
        let settings = self
            .settings
            .read()
            .unwrap()
            .get(&provider)
            .cloned()
            .unwrap_or_default();

        // Build outside the state lock, publish under it.
        let mut built = Vec::new();
        for entry in &sessions {
            for factory in &factories {
                match factory.build(entry, &settings) {
                    Ok(extractor) => built.push(RegisteredExtractor {
                        key: format!("{}:{}", provider, factory.service()),
                        provider,
                        service: factory.service().to_string(),
                        account_id: entry.account_id.clone(),
                        regions: entry.regions.clone(),
                        extractor,
                    }),
                    Err(e) => {
                        warn!(
                            provider = %provider,
                            service = factory.service(),
                            account = %entry.account_id,
                            error = %e,
                            "skipping extractor that failed to build"
                        );
                    }
                }
            }
        }

        let count = built.len();
        let mut state = self.state.write().unwrap();
        // Remove the provider's previous slice so stale keys from a
        // smaller re-registration cannot linger.
        state.extractors.retain(|_, r| r.provider != provider);
        for registered in built {
            state.extractors.insert(registered.key.clone(), registered);
        }
        state.sessions.insert(provider, sessions);
        drop(state);

        info!(provider = %provider, count, "provider extractors registered");
        count
    }

    /// Remove every extractor of `provider` and drop its session
    /// collection. Returns the number removed; 0 when the provider was
    /// never registered.
    pub fn unregister_provider(&self, provider: CloudProvider) -> usize {
        let mut state = self.state.write().unwrap();
        let before = state.extractors.len();
        state.extractors.retain(|_, r| r.provider != provider);
        let removed = before - state.extractors.len();
        state.sessions.remove(&provider);
        drop(state);

        info!(provider = %provider, removed, "provider extractors unregistered");
        removed
    }

    /// Look up one extractor.
    ///
    /// With a provider this is an exact key lookup. Without one, the
    /// first service-name match wins: when the same service name exists
    /// under several providers the result is whichever the scan finds
    /// first, so callers that care must pass the provider.
    pub fn get(
        &self,
        service: &str,
        provider: Option<CloudProvider>,
    ) -> Option<RegisteredExtractor> {
        let state = self.state.read().unwrap();
        match provider {
            Some(p) => state.extractors.get(&format!("{}:{}", p, service)).cloned(),
            None => state
                .extractors
                .values()
                .find(|r| r.service == service)
                .cloned(),
        }
    }

    /// Filter the full instance set by provider and service-name
    /// membership. `services = None` means all.
    pub fn extractors(
        &self,
        services: Option<&[String]>,
        provider: Option<CloudProvider>,
    ) -> Vec<RegisteredExtractor> {
        self.state
            .read()
            .unwrap()
            .extractors
            .values()
            .filter(|r| provider.map_or(true, |p| r.provider == p))
            .filter(|r| services.map_or(true, |list| list.iter().any(|s| s == &r.service)))
            .cloned()
            .collect()
    }

    /// Enumerate registered keys, optionally restricted to one provider.
    pub fn service_keys(&self, provider: Option<CloudProvider>) -> Vec<String> {
        let mut keys: Vec<_> = self
            .state
            .read()
            .unwrap()
            .extractors
            .values()
            .filter(|r| provider.map_or(true, |p| r.provider == p))
            .map(|r| r.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Distinct registered service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .state
            .read()
            .unwrap()
            .extractors
            .values()
            .map(|r| r.service.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// The session collection registered for a provider.
    pub fn sessions(&self, provider: CloudProvider) -> Vec<SessionEntry> {
        self.state
            .read()
            .unwrap()
            .sessions
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live extractor instances.
    pub fn len(&self) -> usize {
        self.state.read().unwrap().extractors.len()
    }

    /// Whether the registry holds no extractors.
    pub fn is_empty(&self) -> bool {
        self.state.read().unwrap().extractors.is_empty()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("keys", &self.service_keys(None))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockExtractorFactory, MockSession};

    fn aws_sessions() -> Vec<SessionEntry> {
        vec![MockSession::entry("111111111111", ["us-east-1", "eu-west-1"])]
    }

    fn registry_with_aws_factories() -> ExtractorRegistry {
        ExtractorRegistry::new()
            .with_factory(Arc::new(
                MockExtractorFactory::new(CloudProvider::Aws, "ec2").region_scoped(),
            ))
            .with_factory(Arc::new(MockExtractorFactory::new(
                CloudProvider::Aws,
                "s3",
            )))
            .with_factory(Arc::new(MockExtractorFactory::new(
                CloudProvider::Gcp,
                "compute",
            )))
    }

    #[test]
    fn test_register_instantiates_matching_factories() {
        let registry = registry_with_aws_factories();
        let count = registry.register_provider(CloudProvider::Aws, aws_sessions());

        assert_eq!(count, 2);
        assert_eq!(registry.service_keys(Some(CloudProvider::Aws)), vec![
            "aws:ec2".to_string(),
            "aws:s3".to_string(),
        ]);
        // Gcp factory untouched
        assert!(registry.service_keys(Some(CloudProvider::Gcp)).is_empty());
    }

    #[test]
    fn test_unregister_round_trip() {
        let registry = registry_with_aws_factories();
        let first = registry.register_provider(CloudProvider::Aws, aws_sessions());

        let removed = registry.unregister_provider(CloudProvider::Aws);
        assert_eq!(removed, first);
        assert!(registry.service_keys(Some(CloudProvider::Aws)).is_empty());
        assert!(registry.sessions(CloudProvider::Aws).is_empty());

        // Re-registering yields the same count as the first registration
        let again = registry.register_provider(CloudProvider::Aws, aws_sessions());
        assert_eq!(again, first);
    }

    #[test]
    fn test_unregister_unknown_provider_is_safe() {
        let registry = registry_with_aws_factories();
        assert_eq!(registry.unregister_provider(CloudProvider::Azure), 0);
    }

    #[test]
    fn test_reregistration_replaces_instances() {
        let registry = registry_with_aws_factories();
        registry.register_provider(CloudProvider::Aws, aws_sessions());

        let replacement = vec![MockSession::entry("222222222222", ["ap-southeast-2"])];
        registry.register_provider(CloudProvider::Aws, replacement);

        let ec2 = registry.get("ec2", Some(CloudProvider::Aws)).unwrap();
        assert_eq!(ec2.account_id, "222222222222");
        assert_eq!(registry.sessions(CloudProvider::Aws).len(), 1);
    }

    #[test]
    fn test_failed_builds_are_skipped() {
        let registry = ExtractorRegistry::new()
            .with_factory(Arc::new(MockExtractorFactory::new(
                CloudProvider::Aws,
                "ec2",
            )))
            .with_factory(Arc::new(
                MockExtractorFactory::new(CloudProvider::Aws, "broken").fail_build(),
            ));

        let count = registry.register_provider(CloudProvider::Aws, aws_sessions());
        assert_eq!(count, 1);
        assert!(registry.get("ec2", Some(CloudProvider::Aws)).is_some());
        assert!(registry.get("broken", Some(CloudProvider::Aws)).is_none());
    }

    #[test]
    fn test_get_without_provider_scans_by_service() {
        let registry = registry_with_aws_factories();
        registry.register_provider(CloudProvider::Aws, aws_sessions());

        assert!(registry.get("s3", None).is_some());
        assert!(registry.get("missing", None).is_none());
    }

    #[test]
    fn test_extractors_filters_by_service_list() {
        let registry = registry_with_aws_factories();
        registry.register_provider(CloudProvider::Aws, aws_sessions());

        let all = registry.extractors(None, None);
        assert_eq!(all.len(), 2);

        let only_s3 = registry.extractors(Some(&["s3".to_string()]), None);
        assert_eq!(only_s3.len(), 1);
        assert_eq!(only_s3[0].service, "s3");
    }

    #[test]
    fn test_multiple_sessions_last_one_wins_per_key() {
        let registry = ExtractorRegistry::new().with_factory(Arc::new(
            MockExtractorFactory::new(CloudProvider::Aws, "ec2"),
        ));
        let sessions = vec![
            MockSession::entry("111111111111", ["us-east-1"]),
            MockSession::entry("222222222222", ["us-west-2"]),
        ];

        // Both instances are constructed and counted; the later session's
        // instance owns the key afterwards.
        let count = registry.register_provider(CloudProvider::Aws, sessions);
        assert_eq!(count, 2);
        assert_eq!(registry.len(), 1);
        let ec2 = registry.get("ec2", Some(CloudProvider::Aws)).unwrap();
        assert_eq!(ec2.account_id, "222222222222");
    }
}
