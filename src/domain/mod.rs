//! Domain models
//!
//! The job record model, free of any I/O concerns.

mod job;

pub use job::{Job, JobKind, RecordError, ShellJob};
