//! Job id allocation
//!
//! Ids are derived from the store directory itself rather than a counter
//! file: the next id is one past the highest numeric directory name. Deleting
//! the newest job therefore frees its id for reuse, while deleting older jobs
//! never does. Callers must hold the store lock across the allocation and the
//! directory creation that consumes it.

use std::io;
use std::path::Path;

use log::warn;

/// Returns the next free job id for `store_dir`.
///
/// Scans the directory for subdirectories with numeric names and returns the
/// maximum plus one, or 1 for an empty store. Entries that are not
/// directories, or whose names do not parse as a non-negative integer, are
/// ignored with a log line.
pub fn next_id(store_dir: &Path) -> io::Result<i64> {
    let mut max = 0;
    for entry in store_dir.read_dir()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        match name.parse::<i64>() {
            Ok(id) if id >= 0 => max = max.max(id),
            _ => warn!("ignoring non-numeric entry in job store: {}", name),
        }
    }
    Ok(max + 1)
}
