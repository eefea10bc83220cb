//! # Storage Layer
//!
//! Persistence layer for the job store.
//!
//! ## Store Layout
//!
//! ```text
//! <root>/
//! ├── .lock            # Transient cross-process lock file
//! ├── config.toml      # Optional per-store settings
//! ├── store/
//! │   └── <id>/
//! │       └── record   # One serialized job per directory
//! └── delete/          # Reserved trash area
//! ```
//!
//! ## Concurrency Safety
//!
//! - [`JobStore`] serializes every operation behind one advisory file lock
//!   (`fs2`), so independent processes can share a root
//! - All record writes are atomic (temp file + rename)
//! - No state is cached between calls; everything is re-derived from disk
//!
//! ## Key Types
//!
//! - [`JobStore`] - CRUD, list and search over persisted jobs
//! - [`StoreLock`] - the store-wide mutual-exclusion primitive
//! - [`StoreConfig`] - per-store settings from `config.toml`

mod config;
mod id;
mod lock;
mod store;

pub use config::StoreConfig;
pub use id::next_id;
pub use lock::{LockGuard, StoreLock};
pub use store::{JobStore, StoreError};
