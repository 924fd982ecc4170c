//! Job store implementations.
//!
//! Available backends:
//! - `MemoryJobStore` - In-memory records (always available)
//! - `SqliteJobStore` - SQLite durable mirror (requires `sqlite` feature)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryJobStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteJobStore;
