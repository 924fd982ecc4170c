//! HTTP transport: delivers artifacts to the policy-evaluation service.
//!
//! Each `send` POSTs one artifact as JSON. Transient failures (throttling,
//! 5xx, connection errors) are retried internally through a
//! [`RetryPolicy`]; the orchestrator never retries sends itself.

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::security::SecretToken;
use crate::traits::transport::Transport;
use crate::types::artifact::Artifact;

/// HTTP sink adapter.
///
/// # Example
///
/// ```rust,ignore
/// use cloudsweep::transports::HttpTransport;
///
/// let transport = HttpTransport::new("https://policy.example.com/v1/artifacts")
///     .with_token("api-token");
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<SecretToken>,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport posting to the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: endpoint.into(),
            token: None,
            retry: RetryPolicy::new(default_retry_config())
                .unwrap_or_default(),
        }
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: impl Into<SecretToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Override the internal retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    async fn send_once(&self, artifact: &Artifact) -> TransportResult<()> {
        let mut request = self.client.post(&self.endpoint).json(artifact);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Http(Box::new(e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 429 {
            return Err(TransportError::Throttled);
        }
        Err(TransportError::Rejected {
            status: status.as_u16(),
        })
    }
}

/// Retry tuning applied to sink delivery unless overridden: a few fast
/// attempts with full jitter, transient failures only.
fn default_retry_config() -> RetryConfig {
    RetryConfig::new()
        .with_max_attempts(4)
        .with_base_delay(std::time::Duration::from_millis(250))
        .with_max_delay(std::time::Duration::from_secs(5))
        .with_jitter(crate::retry::JitterMode::Full)
        .retry_transient()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, artifact: &Artifact) -> TransportResult<()> {
        self.retry.execute(|| self.send_once(artifact)).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Failure;

    #[test]
    fn test_default_retry_config_is_valid() {
        assert!(default_retry_config().validate().is_ok());
    }

    #[test]
    fn test_builder_keeps_token_out_of_debug() {
        let transport = HttpTransport::new("https://sink.example.com").with_token("secret");
        let token = transport.token.as_ref().unwrap();
        assert_eq!(format!("{:?}", token), "[REDACTED]");
    }

    #[test]
    fn test_status_classification() {
        // 429 maps to the throttled kind, 5xx to server, 4xx to invalid;
        // the allow-list in the default config retries the first two only.
        let config = default_retry_config();
        let retry_on = config.retry_on.as_ref().unwrap();
        assert!(retry_on.contains(&TransportError::Throttled.kind()));
        assert!(retry_on.contains(&TransportError::Rejected { status: 503 }.kind()));
        assert!(!retry_on.contains(&TransportError::Rejected { status: 400 }.kind()));
    }
}
