//! Run Store for Quorum
//!
//! Durable record of consensus runs and their per-row results, keyed by an
//! opaque [`RunId`].
//!
//! ## Key Components
//!
//! - [`RunStore`]: backend-agnostic async trait
//! - [`fakes::MemoryRunStore`]: in-memory implementation for tests and
//!   throwaway CLI sessions
//! - [`SurrealRunStore`]: SurrealDB backend (`mem://`, `surrealkv://`, `ws://`)

mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::StorageError;
pub use storage_traits::{
    ContentDigest, RowResult, RowStatus, RunId, RunMetadata, RunRecord, RunStatus, RunStore,
    RunSummary, StorageResult,
};
pub use surreal_store::{SurrealRunStore, SURREALDB_URL_ENV};
