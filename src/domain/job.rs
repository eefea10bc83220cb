//! Job record model
//!
//! Jobs form a closed set of kinds discriminated by a `kind` tag in the
//! serialized record. Decoding is two-phase: read the tag first, then
//! deserialize the full variant from the same bytes. Adding a new kind never
//! changes the encoding of existing kinds, so old records stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed job record: {0}")]
    Malformed(String),

    #[error("unknown job kind '{0}'")]
    UnknownKind(String),

    #[error("failed to encode job record")]
    Encode(#[source] serde_json::Error),
}

/// Discriminator for the closed set of job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Shell,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Shell => "shell",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job that runs a shell command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellJob {
    /// Store-assigned id, unique within the store. 0 until first added.
    pub id: i64,

    /// Human-readable label, not required to be unique.
    pub name: String,

    /// The shell command line to execute.
    pub command: String,

    /// Exit code of the most recent run, written back by an executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit: Option<i32>,

    /// When that run happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// A persisted unit of work, polymorphic over the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    Shell(ShellJob),
}

impl Job {
    /// Creates a shell job that has not been assigned an id yet.
    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        Job::Shell(ShellJob {
            id: 0,
            name: name.into(),
            command: command.into(),
            last_exit: None,
            last_run_at: None,
        })
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::Shell(_) => JobKind::Shell,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Job::Shell(job) => job.id,
        }
    }

    /// Stamps the store-assigned id onto the job.
    pub fn set_id(&mut self, id: i64) {
        match self {
            Job::Shell(job) => job.id = id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Job::Shell(job) => &job.name,
        }
    }

    /// Returns a multi-line human-readable summary of the job.
    pub fn info(&self) -> String {
        match self {
            Job::Shell(job) => {
                let mut info = format!(
                    "kind: shell\nid: {}\nname: {}\ncommand: {}",
                    job.id, job.name, job.command
                );
                if let Some(exit) = job.last_exit {
                    info.push_str(&format!("\nlast exit: {}", exit));
                }
                if let Some(at) = job.last_run_at {
                    info.push_str(&format!("\nlast run: {}", at));
                }
                info
            }
        }
    }

    /// Serializes the job as a tagged record.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec_pretty(self).map_err(RecordError::Encode)
    }

    /// Decodes a serialized record back into a job.
    ///
    /// Two-phase: the bytes must parse as a JSON object carrying a `kind`
    /// tag ([`RecordError::Malformed`] otherwise); the tag must name a known
    /// kind ([`RecordError::UnknownKind`] otherwise); then the full variant
    /// is deserialized from the same value.
    pub fn decode(bytes: &[u8]) -> Result<Job, RecordError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| RecordError::Malformed(e.to_string()))?;

        let kind = match value.get("kind").and_then(serde_json::Value::as_str) {
            Some(kind) => kind.to_string(),
            None => return Err(RecordError::Malformed("missing kind tag".to_string())),
        };

        match kind.as_str() {
            "shell" => serde_json::from_value::<ShellJob>(value)
                .map(Job::Shell)
                .map_err(|e| RecordError::Malformed(e.to_string())),
            other => Err(RecordError::UnknownKind(other.to_string())),
        }
    }
}
