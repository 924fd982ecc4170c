//! Rate-limited transport wrapper.
//!
//! Wraps any Transport implementation with rate limiting using the
//! governor crate. Batching already bounds burst size; this wrapper
//! bounds sustained throughput against a sink with strict quotas.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::TransportResult;
use crate::traits::transport::Transport;
use crate::types::artifact::Artifact;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A transport wrapper that enforces rate limits.
///
/// Uses the governor crate for precise rate limiting with burst support.
pub struct RateLimitedTransport<T: Transport> {
    inner: T,
    limiter: Arc<DefaultRateLimiter>,
}

impl<T: Transport> RateLimitedTransport<T> {
    /// Create a new rate-limited transport.
    ///
    /// # Arguments
    /// * `transport` - The underlying transport to wrap
    /// * `sends_per_second` - Maximum sends per second
    pub fn new(transport: T, sends_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(sends_per_second).expect("sends_per_second must be > 0"),
        );
        Self {
            inner: transport,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with a custom quota.
    pub fn with_quota(transport: T, quota: Quota) -> Self {
        Self {
            inner: transport,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    ///
    /// # Arguments
    /// * `transport` - The underlying transport to wrap
    /// * `sends_per_second` - Sustained rate
    /// * `burst` - Maximum burst size
    pub fn with_burst(transport: T, sends_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(sends_per_second).expect("sends_per_second must be > 0"),
        )
        .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));

        Self {
            inner: transport,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait for the rate limiter before proceeding.
    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<T: Transport> Transport for RateLimitedTransport<T> {
    async fn send(&self, artifact: &Artifact) -> TransportResult<()> {
        self.wait_for_permit().await;
        self.inner.send(artifact).await
    }

    async fn close(&self) -> TransportResult<()> {
        self.inner.close().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for easy rate limiting.
pub trait TransportExt: Transport + Sized {
    /// Wrap this transport with rate limiting.
    fn rate_limited(self, sends_per_second: u32) -> RateLimitedTransport<Self> {
        RateLimitedTransport::new(self, sends_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(
        self,
        sends_per_second: u32,
        burst: u32,
    ) -> RateLimitedTransport<Self> {
        RateLimitedTransport::with_burst(self, sends_per_second, burst)
    }
}

// Implement for all Transports
impl<T: Transport + Sized> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::types::artifact::{Artifact, CloudProvider};
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting() {
        let transport = MockTransport::new().rate_limited(2);
        let artifact = Artifact::new(CloudProvider::Aws, "aws:s3:bucket", "b-1");

        let start = Instant::now();
        for _ in 0..3 {
            transport.send(&artifact).await.unwrap();
        }
        let elapsed = start.elapsed();

        // First send is immediate, the next two wait at 2/sec
        assert!(
            elapsed.as_millis() >= 500,
            "Rate limiting not working: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_passthrough_name() {
        let transport = MockTransport::new().rate_limited_with_burst(5, 10);
        assert_eq!(transport.name(), "mock");
    }

    #[tokio::test]
    async fn test_custom_quota() {
        use nonzero_ext::nonzero;

        let quota = Quota::per_minute(nonzero!(120u32)).allow_burst(nonzero!(5u32));
        let transport = RateLimitedTransport::with_quota(MockTransport::new(), quota);

        let artifact = Artifact::new(CloudProvider::Azure, "azure:vm", "vm-1");
        transport.send(&artifact).await.unwrap();
    }
}
