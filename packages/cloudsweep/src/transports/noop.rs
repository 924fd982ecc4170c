//! No-op transport for dry runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TransportResult;
use crate::traits::transport::Transport;
use crate::types::artifact::Artifact;

/// Counts artifacts and discards them.
#[derive(Debug, Default)]
pub struct NoopTransport {
    sent: AtomicUsize,
}

impl NoopTransport {
    /// Create a no-op transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts discarded so far.
    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _artifact: &Artifact) -> TransportResult<()> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}
