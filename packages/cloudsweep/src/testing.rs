//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that orchestrate extraction
//! without touching real provider SDKs or the network.

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{ExtractError, ExtractResult, TransportError, TransportResult};
use crate::traits::extractor::{Extractor, ExtractorFactory, ExtractorMetadata};
use crate::traits::session::{ProviderSession, SessionEntry};
use crate::traits::transport::Transport;
use crate::types::artifact::{Artifact, CloudProvider};
use crate::types::config::{ExtractionFilters, ExtractorSettings};

/// A provider session with a fixed account and region list.
pub struct MockSession {
    account_id: String,
    regions: Vec<String>,
}

impl MockSession {
    /// Create a session for an account with the given regions.
    pub fn new(
        account_id: impl Into<String>,
        regions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            regions: regions.into_iter().map(|r| r.into()).collect(),
        }
    }

    /// Build a [`SessionEntry`] directly, the common test shape.
    pub fn entry(
        account_id: impl Into<String>,
        regions: impl IntoIterator<Item = impl Into<String>>,
    ) -> SessionEntry {
        let session = Self::new(account_id, regions);
        let account_id = session.account_id.clone();
        let regions = session.regions.clone();
        SessionEntry::new(Arc::new(session), account_id, regions)
    }
}

#[async_trait]
impl ProviderSession for MockSession {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn regions(&self) -> ExtractResult<Vec<String>> {
        Ok(self.regions.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Record of one call made to a [`MockExtractor`].
#[derive(Debug, Clone)]
pub struct MockExtractorCall {
    /// Region the call was scoped to.
    pub region: Option<String>,

    /// Whether filters were passed.
    pub filtered: bool,
}

/// An extractor returning scripted artifacts.
///
/// Produces a configurable number of artifacts per `extract` call, with
/// deterministic resource ids of the form `{service}-{region}-{index}`
/// (`global` when no region is given).
pub struct MockExtractor {
    metadata: ExtractorMetadata,
    account_id: Option<String>,
    artifacts_per_call: usize,
    fail_message: Option<String>,
    latency: Option<Duration>,
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

impl MockExtractor {
    /// Create a mock emitting one artifact per call.
    pub fn new(provider: CloudProvider, service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            metadata: ExtractorMetadata::new(provider, &service)
                .with_description(format!("mock extractor for {}", service)),
            account_id: None,
            artifacts_per_call: 1,
            fail_message: None,
            latency: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Mark the extractor region-scoped.
    pub fn region_scoped(mut self) -> Self {
        self.metadata = self.metadata.region_scoped();
        self
    }

    /// Bind an account id recorded on emitted artifacts.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the number of artifacts emitted per call.
    pub fn with_artifacts(mut self, count: usize) -> Self {
        self.artifacts_per_call = count;
        self
    }

    /// Make every `extract` call fail with a provider error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }

    /// Sleep before answering, to simulate slow provider APIs.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn metadata(&self) -> &ExtractorMetadata {
        &self.metadata
    }

    async fn extract(
        &self,
        region: Option<&str>,
        filters: Option<&ExtractionFilters>,
    ) -> ExtractResult<Vec<Artifact>> {
        self.calls.write().unwrap().push(MockExtractorCall {
            region: region.map(|r| r.to_string()),
            filtered: filters.is_some(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = &self.fail_message {
            return Err(ExtractError::Provider {
                message: message.clone(),
            });
        }

        let scope = region.unwrap_or("global");
        let artifacts = (0..self.artifacts_per_call)
            .map(|index| {
                let mut artifact = Artifact::new(
                    self.metadata.provider,
                    format!("{}:{}:resource", self.metadata.provider, self.metadata.service),
                    format!("{}-{}-{}", self.metadata.service, scope, index),
                )
                .with_configuration(serde_json::json!({
                    "service": self.metadata.service,
                    "index": index,
                }));
                if let Some(region) = region {
                    artifact = artifact.with_region(region);
                }
                if let Some(account) = &self.account_id {
                    artifact = artifact.with_account(account);
                }
                artifact
            })
            .filter(|artifact| self.validate(artifact))
            .collect();
        Ok(artifacts)
    }

    fn transform(&self, raw: serde_json::Value) -> ExtractResult<Artifact> {
        let id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Artifact::new(
            self.metadata.provider,
            format!("{}:{}:resource", self.metadata.provider, self.metadata.service),
            id,
        )
        .with_raw(raw))
    }
}

/// A factory building [`MockExtractor`]s bound to the session's account.
pub struct MockExtractorFactory {
    provider: CloudProvider,
    service: String,
    region_scoped: bool,
    artifacts_per_call: usize,
    fail_message: Option<String>,
    latency: Option<Duration>,
    fail_build: bool,
}

impl MockExtractorFactory {
    /// Create a factory for a provider/service pair.
    pub fn new(provider: CloudProvider, service: impl Into<String>) -> Self {
        Self {
            provider,
            service: service.into(),
            region_scoped: false,
            artifacts_per_call: 1,
            fail_message: None,
            latency: None,
            fail_build: false,
        }
    }

    /// Build region-scoped extractors.
    pub fn region_scoped(mut self) -> Self {
        self.region_scoped = true;
        self
    }

    /// Set artifacts emitted per extract call.
    pub fn with_artifacts(mut self, count: usize) -> Self {
        self.artifacts_per_call = count;
        self
    }

    /// Build extractors whose `extract` always fails.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }

    /// Build extractors that sleep before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `build` itself fail, for registration-fault tests.
    pub fn fail_build(mut self) -> Self {
        self.fail_build = true;
        self
    }
}

impl ExtractorFactory for MockExtractorFactory {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    fn service(&self) -> &str {
        &self.service
    }

    fn build(
        &self,
        entry: &SessionEntry,
        _settings: &ExtractorSettings,
    ) -> ExtractResult<Arc<dyn Extractor>> {
        if self.fail_build {
            return Err(ExtractError::Build {
                service: self.service.clone(),
                reason: "scripted build failure".to_string(),
            });
        }
        let mut extractor = MockExtractor::new(self.provider, &self.service)
            .with_account(&entry.account_id)
            .with_artifacts(self.artifacts_per_call);
        if self.region_scoped {
            extractor = extractor.region_scoped();
        }
        if let Some(message) = &self.fail_message {
            extractor = extractor.failing(message);
        }
        if let Some(latency) = self.latency {
            extractor = extractor.with_latency(latency);
        }
        Ok(Arc::new(extractor))
    }
}

/// A transport recording every sent artifact with its send time.
///
/// Failure injection is per resource id, so tests can make exactly one
/// artifact in a batch fail.
pub struct MockTransport {
    sent: Arc<RwLock<Vec<(Artifact, Instant)>>>,
    fail_resource_ids: HashSet<String>,
    fail_all: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a transport that accepts everything.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            fail_resource_ids: HashSet::new(),
            fail_all: false,
        }
    }

    /// Reject sends for one resource id.
    pub fn failing_for(mut self, resource_id: impl Into<String>) -> Self {
        self.fail_resource_ids.insert(resource_id.into());
        self
    }

    /// Reject every send.
    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Shared handle to the sent-artifact log; survives handing the
    /// transport to an orchestrator.
    pub fn sent_handle(&self) -> Arc<RwLock<Vec<(Artifact, Instant)>>> {
        Arc::clone(&self.sent)
    }

    /// Artifacts accepted so far.
    pub fn sent(&self) -> Vec<Artifact> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .map(|(artifact, _)| artifact.clone())
            .collect()
    }

    /// Number of artifacts accepted so far.
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, artifact: &Artifact) -> TransportResult<()> {
        if self.fail_all || self.fail_resource_ids.contains(artifact.resource_id()) {
            return Err(TransportError::Rejected { status: 502 });
        }
        self.sent
            .write()
            .unwrap()
            .push((artifact.clone(), Instant::now()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
