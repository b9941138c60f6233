//! ReductStore client SDK for the data source adapter
//!
//! Provides the record model, the [`RecordStore`]/[`Bucket`] abstraction the
//! adapter queries through, an HTTP implementation speaking the store's
//! batched read protocol, and an in-memory implementation for tests.

mod batch;
mod client;
mod error;
mod memory;
mod store;
mod types;

pub use client::{ClientOptions, ReductBucket, ReductClient};
pub use error::{ClientError, Result};
pub use memory::{MemoryBucket, MemoryStore};
pub use store::{Bucket, RecordStore, RecordStream};
pub use types::*;

/// Re-export for convenience
pub mod prelude {
    pub use super::{Bucket, ClientError, RecordStore, RecordStream, Result};
    pub use super::types::*;
}
