//! Application configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults (including every engine constant)
//! 2. `roomsense.ron` file (if exists)
//! 3. Environment variables prefixed with `ROOMSENSE_`
//!
//! Example environment variable: `ROOMSENSE_ENGINE__REACHABILITY__GRID_SIZE=0.5`

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use roomsense_core::EngineConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// How query results are printed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print every reachable position instead of just the count
    pub list_positions: bool,
    /// Cap on listed entries per query
    pub max_listed: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            list_positions: false,
            max_listed: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `roomsense.ron` file (if exists)
    /// 3. Environment variables prefixed with `ROOMSENSE_` (highest priority)
    pub fn load() -> Result<Self> {
        Self::load_from("roomsense")
    }

    /// Same layering with a custom config file name (extension optional)
    pub fn load_from(file_name: &str) -> Result<Self> {
        Self::load_layered(file_name, None)
    }

    /// `env` replaces the process environment when given
    fn load_layered(file_name: &str, env: Option<Map<String, String>>) -> Result<Self> {
        // Layer 1: serialized defaults, so a partial file or a single
        // environment variable never leaves a section half filled
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to serialize defaults")?;

        let builder = Config::builder()
            .add_source(defaults)
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(file_name)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (ROOMSENSE_ENGINE__AGENT__RADIUS, etc.)
            .add_source(
                Environment::with_prefix("ROOMSENSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
