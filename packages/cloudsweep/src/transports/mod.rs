//! Transport implementations for artifact delivery.
//!
//! Available adapters:
//! - `HttpTransport` - POSTs artifacts to the policy sink (retries internally)
//! - `FileTransport` - NDJSON file sink for development
//! - `NoopTransport` - Counts and discards (dry runs)
//! - `RateLimitedTransport` - Wrapper that adds rate limiting

mod file;
mod http;
mod noop;
mod rate_limited;

pub use file::FileTransport;
pub use http::HttpTransport;
pub use noop::NoopTransport;
pub use rate_limited::{RateLimitedTransport, TransportExt};
