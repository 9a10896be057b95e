//! Tracker configuration
//!
//! Read from the `[tracking]` table of `config.toml`:
//!
//! ```toml
//! [tracking]
//! block_window = 5
//! pairwise_guard = 250000
//! ```
//!
//! Every key is optional and falls back to its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Default number of consecutive lines hashed together when looking for moved blocks.
pub const DEFAULT_BLOCK_WINDOW: usize = 5;

/// Default bound on `old lines × new lines` before pairwise block scoring is skipped.
pub const DEFAULT_PAIRWISE_GUARD: usize = 250_000;

/// Name of the configuration file inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Tunable constants of the tracking cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Window size of the rolling block hash (lines)
    pub block_window: usize,
    /// Pairwise block scoring runs only while `old lines × new lines` stays below this
    pub pairwise_guard: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            block_window: DEFAULT_BLOCK_WINDOW,
            pairwise_guard: DEFAULT_PAIRWISE_GUARD,
        }
    }
}

impl TrackerConfig {
    /// Parse the `[tracking]` table out of a TOML document.
    ///
    /// A document without the table yields the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ConfigFile {
            #[serde(default)]
            tracking: TrackerConfig,
        }

        let parsed: ConfigFile = toml::from_str(content)?;
        parsed.tracking.validate()?;
        Ok(parsed.tracking)
    }

    /// Load `config.toml` from a directory, or the defaults if it doesn't exist.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        if !config_file.exists() {
            debug!("No config at {:?}, using tracker defaults", config_file);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file)?;
        Self::from_toml_str(&content)
    }

    /// Load from `~/.palimpsest/config.toml`.
    pub fn load_default() -> Result<Self> {
        Self::load(&default_config_dir())
    }

    /// Reject values that would disable the block pass in a confusing way.
    pub fn validate(&self) -> Result<()> {
        if self.block_window == 0 {
            return Err(Error::InvalidConfig(
                "tracking.block_window must be at least 1".to_string(),
            ));
        }
        if self.pairwise_guard == 0 {
            return Err(Error::InvalidConfig(
                "tracking.pairwise_guard must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config directory
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".palimpsest")
}
