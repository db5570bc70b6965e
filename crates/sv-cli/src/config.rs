//! `sieve.toml` loading. Every field has a default, so a missing file or a
//! partial one is fine.

use std::error::Error;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sv_io::{DecodePolicy, SubscriptionOptions, DEFAULT_JOURNAL_SIZE};

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct JournalConfig {
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
    /// Bytes pre-allocated when the journal is created.
    #[serde(default = "default_journal_size")]
    pub size: u64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
            size: default_journal_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_search_window")]
    pub search_window: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_window: default_search_window(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubscriptionConfig {
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
    #[serde(default)]
    pub decode_policy: DecodePolicy,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("journal.db")
}
fn default_journal_size() -> u64 {
    DEFAULT_JOURNAL_SIZE
}
fn default_page_size() -> usize {
    20
}
fn default_search_window() -> usize {
    100
}
fn default_checkpoint_interval() -> u32 {
    10
}

impl Config {
    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn subscription_options(&self, page_size: usize, search_window: usize) -> SubscriptionOptions {
        SubscriptionOptions {
            max_records: page_size,
            max_search_window: search_window,
            checkpoint_interval: self.subscription.checkpoint_interval,
            decode_policy: self.subscription.decode_policy,
        }
    }
}
