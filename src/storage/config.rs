//! Store configuration
//!
//! Each store root may carry a `config.toml` tuning how this process talks
//! to the store. A missing file means defaults everywhere, so `jobbox init`
//! is optional and stores created by older versions keep working.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

const DEFAULT_CONFIG: &str = "\
# jobbox store configuration
#
# How long to wait for the store lock before giving up, in milliseconds.
# When unset, operations block until the lock is free.
#lock_timeout_ms = 5000
";

/// Per-store settings loaded from `config.toml` at the store root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on lock acquisition, in milliseconds. `None` blocks forever.
    pub lock_timeout_ms: Option<u64>,
}

impl StoreConfig {
    /// Loads the configuration for the store rooted at `root`.
    ///
    /// A missing file yields the defaults; a present but malformed file is
    /// an error, since silently ignoring it would mask typos.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Writes a commented default `config.toml` unless one already exists.
    pub fn write_default(root: &Path) -> Result<()> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            return Ok(());
        }
        fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    /// The configured lock timeout, if any.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
