//! Provider-Agnostic Cloud Configuration Extraction Orchestration
//!
//! A library that coordinates *when* and *how* cloud configuration
//! extractors run, and how their output reaches a remote
//! policy-evaluation sink, without interpreting a single byte of what
//! they extract.
//!
//! # Design Philosophy
//!
//! **"Coordinate, don't interpret"**
//!
//! - Extractors own provider semantics; the core owns scheduling
//! - Partial failure is normal: one bad task never sinks its siblings
//! - Delivery is batched and paced, never unbounded
//! - Retry decisions live with whoever owns the failing call
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cloudsweep::{
//!     CloudProvider, ExtractionOrchestrator, ExtractionRequest, ExtractorRegistry,
//! };
//! use cloudsweep::transports::HttpTransport;
//!
//! // Wire up the registry with extractor factories, then bind sessions
//! let registry = Arc::new(
//!     ExtractorRegistry::new()
//!         .with_factory(Arc::new(Ec2ExtractorFactory))
//!         .with_factory(Arc::new(S3ExtractorFactory)),
//! );
//! registry.register_provider(CloudProvider::Aws, sessions);
//!
//! // Run extraction and poll the job
//! let transport = HttpTransport::new("https://policy.example.com/v1/artifacts");
//! let orchestrator = ExtractionOrchestrator::new(registry, transport);
//! let job_id = orchestrator.run_extraction(ExtractionRequest::new()).await;
//! let job = orchestrator.job_status(job_id).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core contracts (Extractor, Transport, ProviderSession, JobStore)
//! - [`types`] - Domain value types (Artifact, Job, configs)
//! - [`registry`] - Live extractor instances keyed by provider and service
//! - [`orchestrator`] - Fan-out, batching, and job lifecycle
//! - [`retry`] - Backoff/jitter retry engine
//! - [`transports`] - Delivery adapters (HTTP, file, no-op, rate-limited)
//! - [`stores`] - Job persistence (memory, SQLite)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod transports;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractError, StoreError, SweepError, TransportError};
pub use traits::{
    extractor::{Extractor, ExtractorExt, ExtractorFactory, ExtractorMetadata, RetryingExtractor},
    session::{ProviderSession, SessionEntry},
    store::JobStore,
    transport::Transport,
};
pub use types::{
    artifact::{Artifact, ArtifactMetadata, CloudProvider},
    config::{ExtractionFilters, ExtractionRequest, ExtractorSettings, OrchestratorConfig},
    job::{Job, JobStatus},
};

// Re-export the engine pieces
pub use orchestrator::ExtractionOrchestrator;
pub use registry::{ExtractorRegistry, RegisteredExtractor};
pub use retry::{
    BackoffStrategy, Failure, FailureKind, JitterMode, RetryAttempt, RetryConfig,
    RetryConfigError, RetryPolicy, RetryStats,
};

// Re-export security helpers
pub use security::SecretToken;

// Re-export stores
pub use stores::MemoryJobStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteJobStore;

// Re-export transports
pub use transports::{
    FileTransport, HttpTransport, NoopTransport, RateLimitedTransport, TransportExt,
};

// Re-export testing utilities
pub use testing::{MockExtractor, MockExtractorFactory, MockSession, MockTransport};
