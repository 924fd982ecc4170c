//! Artifact types: standardized records describing cloud resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    /// Lowercase tag used in registry keys and artifact payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            "gcp" => Ok(CloudProvider::Gcp),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Identifying metadata attached to every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Provider-assigned resource identifier (ARN, resource ID, ...).
    pub resource_id: String,

    /// Human-readable resource name, when the provider has one.
    pub resource_name: Option<String>,

    /// Region the resource lives in; None for global resources.
    pub region: Option<String>,

    /// Account, subscription, or project the resource belongs to.
    pub account_id: Option<String>,

    /// When the extractor collected this record.
    pub collected_at: DateTime<Utc>,
}

/// One standardized record describing a single cloud resource, ready for
/// delivery to the policy-evaluation sink.
///
/// The orchestrator treats the configuration payload as opaque; only the
/// resource id is read, for error attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Which cloud the resource came from.
    pub provider: CloudProvider,

    /// Resource-type tag (e.g. "aws:ec2:instance").
    pub resource_type: String,

    /// Identifying metadata.
    pub metadata: ArtifactMetadata,

    /// The extracted configuration document.
    pub configuration: serde_json::Value,

    /// Unmapped provider response, when the extractor keeps it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Artifact {
    /// Create an artifact with empty configuration.
    pub fn new(
        provider: CloudProvider,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            resource_type: resource_type.into(),
            metadata: ArtifactMetadata {
                resource_id: resource_id.into(),
                resource_name: None,
                region: None,
                account_id: None,
                collected_at: Utc::now(),
            },
            configuration: serde_json::Value::Object(serde_json::Map::new()),
            raw: None,
        }
    }

    /// Set the resource name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.resource_name = Some(name.into());
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.metadata.region = Some(region.into());
        self
    }

    /// Set the owning account/subscription/project.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.metadata.account_id = Some(account_id.into());
        self
    }

    /// Set the configuration document.
    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = configuration;
        self
    }

    /// Attach the raw provider response.
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Resource id used for error attribution.
    pub fn resource_id(&self) -> &str {
        &self.metadata.resource_id
    }

    /// Minimal shape check applied by extractors before returning
    /// artifacts: non-empty type and id, object-valued configuration.
    pub fn is_well_formed(&self) -> bool {
        !self.resource_type.trim().is_empty()
            && !self.metadata.resource_id.trim().is_empty()
            && self.configuration.is_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_builder() {
        let artifact = Artifact::new(CloudProvider::Aws, "aws:s3:bucket", "my-bucket")
            .with_name("my-bucket")
            .with_region("us-east-1")
            .with_account("123456789012")
            .with_configuration(json!({"versioning": "Enabled"}));

        assert_eq!(artifact.resource_id(), "my-bucket");
        assert_eq!(artifact.metadata.region.as_deref(), Some("us-east-1"));
        assert!(artifact.is_well_formed());
    }

    #[test]
    fn test_well_formed_rejects_blank_id() {
        let artifact = Artifact::new(CloudProvider::Gcp, "gcp:compute:instance", "  ");
        assert!(!artifact.is_well_formed());
    }

    #[test]
    fn test_well_formed_rejects_non_object_configuration() {
        let artifact = Artifact::new(CloudProvider::Azure, "azure:vm", "vm-1")
            .with_configuration(json!("not an object"));
        assert!(!artifact.is_well_formed());
    }

    #[test]
    fn test_provider_round_trip() {
        for provider in [CloudProvider::Aws, CloudProvider::Azure, CloudProvider::Gcp] {
            assert_eq!(provider.as_str().parse::<CloudProvider>(), Ok(provider));
        }
        assert!("digitalocean".parse::<CloudProvider>().is_err());
    }

    #[test]
    fn test_raw_skipped_when_absent() {
        let artifact = Artifact::new(CloudProvider::Aws, "aws:ec2:instance", "i-1");
        let value = serde_json::to_value(&artifact).unwrap();
        assert!(value.get("raw").is_none());
    }
}
