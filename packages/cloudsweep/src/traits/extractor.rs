//! Extractor contract: the fixed interface every extraction unit
//! satisfies.
//!
//! The orchestration core is defined entirely in terms of this trait. It
//! only ever calls [`metadata`] and [`extract`]; `transform` and
//! `validate` exist for implementations to map and check provider records
//! before returning them.
//!
//! Extractors whose underlying SDK calls block should run them on a
//! bounded worker pool (`tokio::task::spawn_blocking` sized by
//! [`ExtractorSettings::max_workers`]) so they do not stall the
//! cooperative scheduler.
//!
//! [`metadata`]: Extractor::metadata
//! [`extract`]: Extractor::extract
//! [`ExtractorSettings::max_workers`]: crate::types::config::ExtractorSettings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ExtractResult;
use crate::retry::RetryPolicy;
use crate::traits::session::SessionEntry;
use crate::types::artifact::{Artifact, CloudProvider};
use crate::types::config::{ExtractionFilters, ExtractorSettings};

/// Immutable metadata describing one extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorMetadata {
    /// Service name (e.g. "ec2", "storage-accounts").
    pub service: String,

    /// Extractor implementation version.
    pub version: String,

    /// Human description of what gets collected.
    pub description: String,

    /// Resource types this extractor emits.
    pub resource_types: Vec<String>,

    /// Provider tag.
    pub provider: CloudProvider,

    /// Whether extraction must run once per region.
    pub region_scoped: bool,

    /// Whether the extractor paginates provider responses internally.
    pub paginated: bool,
}

impl ExtractorMetadata {
    /// Create metadata with defaults: global scope, no pagination.
    pub fn new(provider: CloudProvider, service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: "1.0".to_string(),
            description: String::new(),
            resource_types: Vec::new(),
            provider,
            region_scoped: false,
            paginated: false,
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the emitted resource types.
    pub fn with_resource_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.resource_types = types.into_iter().map(|t| t.into()).collect();
        self
    }

    /// Mark the extractor as region-scoped.
    pub fn region_scoped(mut self) -> Self {
        self.region_scoped = true;
        self
    }

    /// Mark the extractor as internally paginating.
    pub fn paginated(mut self) -> Self {
        self.paginated = true;
        self
    }

    /// Registry key: `{provider}:{service}`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.provider, self.service)
    }
}

/// An extraction unit for one service of one provider, bound to one
/// session.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Static metadata for this extractor.
    fn metadata(&self) -> &ExtractorMetadata;

    /// Enumerate resources, optionally narrowed to one region and a
    /// filter set.
    ///
    /// Region-scoped extractors receive `Some(region)` once per region
    /// during fan-out; global extractors always receive `None` and cover
    /// all locations internally.
    async fn extract(
        &self,
        region: Option<&str>,
        filters: Option<&ExtractionFilters>,
    ) -> ExtractResult<Vec<Artifact>>;

    /// Map one raw provider record to an artifact.
    ///
    /// Pure; the orchestrator never calls this. Implementations use it
    /// inside `extract`.
    fn transform(&self, raw: serde_json::Value) -> ExtractResult<Artifact>;

    /// Well-formedness check applied before returning an artifact.
    fn validate(&self, artifact: &Artifact) -> bool {
        artifact.is_well_formed() && artifact.provider == self.metadata().provider
    }
}

/// Builds extractor instances bound to a session: the "extractor class"
/// the registry instantiates once per registered account.
pub trait ExtractorFactory: Send + Sync {
    /// Provider whose sessions this factory understands.
    fn provider(&self) -> CloudProvider;

    /// Service name of the instances this factory builds.
    fn service(&self) -> &str;

    /// Build one instance bound to `entry` and the provider's settings
    /// slice.
    fn build(
        &self,
        entry: &SessionEntry,
        settings: &ExtractorSettings,
    ) -> ExtractResult<Arc<dyn Extractor>>;
}

/// An extractor that retries `extract` through a [`RetryPolicy`].
///
/// The provider-throttling recovery path: wrap an extractor whose SDK
/// surfaces 429s and let the policy ride them out.
///
/// # Example
///
/// ```rust,ignore
/// let extractor = Ec2Extractor::new(session)
///     .with_retries(RetryPolicy::new(RetryConfig::new().retry_transient())?);
/// ```
pub struct RetryingExtractor<E: Extractor> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Extractor> RetryingExtractor<E> {
    /// Wrap an extractor with the given policy.
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<E: Extractor> Extractor for RetryingExtractor<E> {
    fn metadata(&self) -> &ExtractorMetadata {
        self.inner.metadata()
    }

    async fn extract(
        &self,
        region: Option<&str>,
        filters: Option<&ExtractionFilters>,
    ) -> ExtractResult<Vec<Artifact>> {
        self.policy
            .execute(|| self.inner.extract(region, filters))
            .await
    }

    fn transform(&self, raw: serde_json::Value) -> ExtractResult<Artifact> {
        self.inner.transform(raw)
    }
}

/// Extension trait for ergonomic wrapping.
pub trait ExtractorExt: Extractor + Sized {
    /// Wrap this extractor with a retry policy.
    fn with_retries(self, policy: RetryPolicy) -> RetryingExtractor<Self> {
        RetryingExtractor::new(self, policy)
    }
}

impl<E: Extractor + Sized> ExtractorExt for E {}
