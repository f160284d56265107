//! Application configuration management.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML configuration file (platform config directory or `--config`)
//! 3. `BLOCKDEDUPE_*` environment variables
//! 4. CLI flags (applied by the caller)
//!
//! ```toml
//! min_blocks = 2
//! singleton_filter = true
//! max_split_iterations = 10000
//! parallel = true
//! pretty = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::analyzer::AnalyzerConfig;
use crate::graph::DEFAULT_MAX_SPLIT_ITERATIONS;
use crate::vectors::DEFAULT_MIN_BLOCKS;

/// Environment variable prefix for configuration keys.
pub const ENV_PREFIX: &str = "BLOCKDEDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum shared blocks a file needs to be grouped.
    pub min_blocks: usize,
    /// Discard top-level components holding a single file.
    pub singleton_filter: bool,
    /// Bound on edge removals while splitting one component.
    pub max_split_iterations: usize,
    /// Partition independent components in parallel.
    pub parallel: bool,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_blocks: DEFAULT_MIN_BLOCKS,
            singleton_filter: true,
            max_split_iterations: DEFAULT_MAX_SPLIT_ITERATIONS,
            parallel: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load from `path` (or the default location) merged with the
    /// environment.
    ///
    /// A missing file at the default location falls back to defaults. A
    /// missing file named explicitly is an error.
    ///
    /// # Errors
    ///
    /// Fails if an explicit file is missing, if the file or environment holds
    /// values of the wrong type, or if [`Config::validate`] rejects the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("configuration file not found: {}", path.display());
                }
                Self::load_from_path(path)
            }
            None => match Self::config_path() {
                Ok(path) => Self::load_from_path(&path),
                Err(e) => {
                    log::debug!("No config directory, using defaults: {}", e);
                    Self::extract(Self::figment())
                }
            },
        }
    }

    /// Load from a specific TOML file merged with the environment. A missing
    /// file contributes nothing.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, wrongly typed values, or invalid settings.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Fails if `min_blocks` or `max_split_iterations` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.min_blocks == 0 {
            bail!("min_blocks must be at least 1");
        }
        if self.max_split_iterations == 0 {
            bail!("max_split_iterations must be at least 1");
        }
        Ok(())
    }

    /// Write the configuration as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if serialization or any filesystem operation fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("serializing configuration")?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Analyzer settings carried by this configuration.
    #[must_use]
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::default()
            .with_min_blocks(self.min_blocks)
            .with_singleton_filter(self.singleton_filter)
            .with_max_split_iterations(self.max_split_iterations)
            .with_parallel(self.parallel)
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Fails if no home directory can be determined.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("org", "blockdedupe", "blockdedupe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
