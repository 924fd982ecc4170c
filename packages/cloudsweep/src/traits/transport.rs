//! Transport contract: delivering artifacts to the policy-evaluation
//! sink.

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::types::artifact::Artifact;

/// Delivers one artifact to the remote sink.
///
/// Every `send` is independent: the orchestrator dispatches a batch
/// concurrently, waits for all outcomes, and never retries a failed send
/// itself. Adapters that want retries apply their own [`RetryPolicy`]
/// internally.
///
/// [`RetryPolicy`]: crate::retry::RetryPolicy
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a single artifact.
    async fn send(&self, artifact: &Artifact) -> TransportResult<()>;

    /// Gracefully release underlying connections.
    ///
    /// Invoked once by the process owner at shutdown, not by the
    /// orchestrator during normal operation.
    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }

    /// Adapter name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
