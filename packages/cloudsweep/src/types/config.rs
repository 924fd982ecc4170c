//! Configuration types for orchestration and extractors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Filters narrowing what an extraction run collects.
///
/// Passed opaquely to extractors; the orchestrator never interprets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionFilters {
    /// Only collect these resource types (empty = all).
    #[serde(default)]
    pub resource_types: Vec<String>,

    /// Only collect resources carrying all of these tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Only collect these specific resources.
    #[serde(default)]
    pub resource_ids: Vec<String>,
}

impl ExtractionFilters {
    /// Create an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to specific resource types.
    pub fn for_resource_types(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            resource_types: types.into_iter().map(|t| t.into()).collect(),
            ..Default::default()
        }
    }

    /// Require a tag key/value pair.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Restrict to specific resource ids.
    pub fn with_resource_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.resource_ids = ids.into_iter().map(|i| i.into()).collect();
        self
    }

    /// Check whether a resource type passes this filter.
    pub fn matches_resource_type(&self, resource_type: &str) -> bool {
        self.resource_types.is_empty() || self.resource_types.iter().any(|t| t == resource_type)
    }
}

/// Static per-provider settings handed to extractor factories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorSettings {
    /// Worker pool width for extractors that call blocking provider SDKs.
    pub max_workers: usize,

    /// Page size hint for extractors that paginate internally.
    pub page_size: usize,

    /// Provider-specific options (endpoint overrides, API versions, ...).
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            max_workers: 8,
            page_size: 100,
            options: HashMap::new(),
        }
    }
}

impl ExtractorSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool width.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the pagination hint.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Add a provider-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Tuning for the orchestrator's delivery loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Batch size used when a request does not specify one.
    pub default_batch_size: usize,

    /// Pause between consecutive batches. Bounds burst rate against the
    /// receiving service.
    pub batch_pacing: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 50,
            batch_pacing: Duration::from_millis(200),
        }
    }
}

impl OrchestratorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default batch size.
    pub fn with_default_batch_size(mut self, size: usize) -> Self {
        self.default_batch_size = size;
        self
    }

    /// Set the inter-batch pacing delay.
    pub fn with_batch_pacing(mut self, pacing: Duration) -> Self {
        self.batch_pacing = pacing;
        self
    }
}

/// Parameters for one extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    /// Services to extract; None means every registered service.
    pub services: Option<Vec<String>>,

    /// Regions to fan out over; None lets each extractor's session decide.
    pub regions: Option<Vec<String>>,

    /// Filters passed through to extractors.
    pub filters: Option<ExtractionFilters>,

    /// Delivery batch size; None uses the orchestrator default.
    pub batch_size: Option<usize>,
}

impl ExtractionRequest {
    /// Request extraction of every registered service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request specific services.
    pub fn for_services(services: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            services: Some(services.into_iter().map(|s| s.into()).collect()),
            ..Default::default()
        }
    }

    /// Restrict the run to specific regions.
    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.regions = Some(regions.into_iter().map(|r| r.into()).collect());
        self
    }

    /// Attach extraction filters.
    pub fn with_filters(mut self, filters: ExtractionFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Override the delivery batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_match_resource_type() {
        let open = ExtractionFilters::new();
        assert!(open.matches_resource_type("aws:ec2:instance"));

        let narrow = ExtractionFilters::for_resource_types(["aws:s3:bucket"]);
        assert!(narrow.matches_resource_type("aws:s3:bucket"));
        assert!(!narrow.matches_resource_type("aws:ec2:instance"));
    }

    #[test]
    fn test_request_builder() {
        let request = ExtractionRequest::for_services(["ec2", "s3"])
            .with_regions(["us-east-1"])
            .with_batch_size(25);

        assert_eq!(request.services.as_ref().unwrap().len(), 2);
        assert_eq!(request.regions.as_ref().unwrap(), &["us-east-1"]);
        assert_eq!(request.batch_size, Some(25));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ExtractorSettings::default();
        assert_eq!(settings.max_workers, 8);
        assert!(settings.options.is_empty());
    }
}
