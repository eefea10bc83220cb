//! jobbox - a local, file-backed store for shell command jobs
//!
//! Multiple independent processes can create, read, update, delete and list
//! job records against the same store root with no daemon in between. A
//! filesystem lock serializes every operation, and all state is re-derived
//! from disk on each call, which is what makes cross-process access safe.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Job, JobKind, RecordError, ShellJob};
pub use storage::{JobStore, StoreError};
