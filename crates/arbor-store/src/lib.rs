//! arbor-store
//!
//! Persistence backends for `arbor_core::store::StateStore`:
//! - `FileStore`: one JSON file per key under a root directory, written
//!   atomically, split into checksummed parts when large
//! - `QuotaStore`: size limit wrapper around any store
//!
//! Stores are synchronous and single-writer. Two processes saving the same key
//! race and the last save wins; nothing here coordinates between them.

pub mod error;
#[cfg(feature = "fs")]
pub mod file;
pub mod quota;

pub use crate::error::{StoreError, StoreResult};
#[cfg(feature = "fs")]
pub use crate::file::{FileStore, FileStoreConfig, DEFAULT_CHUNK_BYTES};
pub use crate::quota::QuotaStore;
