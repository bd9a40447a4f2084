use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{DEFAULT_PATH_LIMIT, MAX_PATH_LIMIT};
use crate::risk::RiskAveraging;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub vendorgraph: VendorGraphConfig,
    #[serde(default)]
    pub graph_store: GraphStoreConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

/// Relational store location and logging
#[derive(Debug, Clone, Deserialize)]
pub struct VendorGraphConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Native graph store
#[derive(Debug, Clone, Deserialize)]
pub struct GraphStoreConfig {
    #[serde(default = "default_graph_store_enabled")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            enabled: default_graph_store_enabled(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Defaults for path queries
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_traversal_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub default_min_strength: f64,
    /// Per-call deadline; unset means unbounded.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_traversal_limit(),
            default_min_strength: 0.0,
            deadline_ms: None,
        }
    }
}

/// Risk aggregation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_hotspot_min_connections")]
    pub hotspot_min_connections: usize,
    #[serde(default = "default_deep_search_limit")]
    pub deep_search_limit: usize,
    #[serde(default = "default_nth_party_limit")]
    pub nth_party_limit: usize,
    #[serde(default = "default_top_risk_paths")]
    pub top_risk_paths: usize,
    #[serde(default)]
    pub nth_party_averaging: RiskAveraging,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            hotspot_min_connections: default_hotspot_min_connections(),
            deep_search_limit: default_deep_search_limit(),
            nth_party_limit: default_nth_party_limit(),
            top_risk_paths: default_top_risk_paths(),
            nth_party_averaging: RiskAveraging::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_graph_store_enabled() -> bool {
    true
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./vendor_graph.json")
}

fn default_traversal_limit() -> usize {
    DEFAULT_PATH_LIMIT
}

fn default_hotspot_min_connections() -> usize {
    5
}

fn default_deep_search_limit() -> usize {
    1000
}

fn default_nth_party_limit() -> usize {
    500
}

fn default_top_risk_paths() -> usize {
    10
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in VENDORGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("VENDORGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Logger environment: `RUST_LOG` when set, otherwise `vendorgraph.log_level`.
    pub fn log_env(&self) -> env_logger::Env<'_> {
        env_logger::Env::default().filter_or("RUST_LOG", self.vendorgraph.log_level.as_str())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.vendorgraph.db_path.as_os_str().is_empty() {
            anyhow::bail!("vendorgraph.db_path must not be empty");
        }

        if !LOG_LEVELS.contains(&self.vendorgraph.log_level.as_str()) {
            anyhow::bail!(
                "vendorgraph.log_level must be one of {}, got {}",
                LOG_LEVELS.join(", "),
                self.vendorgraph.log_level
            );
        }

        if self.graph_store.enabled && self.graph_store.snapshot_path.as_os_str().is_empty() {
            anyhow::bail!("graph_store.snapshot_path must be set when graph_store.enabled = true");
        }

        check_limit("traversal.default_limit", self.traversal.default_limit)?;

        if !(0.0..=1.0).contains(&self.traversal.default_min_strength) {
            anyhow::bail!("traversal.default_min_strength must be between 0.0 and 1.0");
        }

        if self.traversal.deadline_ms == Some(0) {
            anyhow::bail!("traversal.deadline_ms must be greater than 0 (omit it to disable)");
        }

        if self.risk.hotspot_min_connections == 0 {
            anyhow::bail!("risk.hotspot_min_connections must be greater than 0");
        }

        check_limit("risk.deep_search_limit", self.risk.deep_search_limit)?;
        check_limit("risk.nth_party_limit", self.risk.nth_party_limit)?;

        if self.risk.top_risk_paths == 0 {
            anyhow::bail!("risk.top_risk_paths must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.vendorgraph.db_path
    }

    /// Get graph snapshot path
    pub fn snapshot_path(&self) -> &Path {
        &self.graph_store.snapshot_path
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.traversal.deadline_ms.map(Duration::from_millis)
    }
}

fn check_limit(name: &str, value: usize) -> Result<()> {
    if value == 0 || value > MAX_PATH_LIMIT {
        anyhow::bail!("{} must be between 1 and {}, got {}", name, MAX_PATH_LIMIT, value);
    }
    Ok(())
}
