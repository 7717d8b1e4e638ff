//! Gateway configuration
//!
//! Loaded from a single JSON file. Every field except `tablets` has a default.
//!
//! ```json
//! {
//!   "keyspace": "commerce",
//!   "healthcheck_interval_ms": 1000,
//!   "tablets": [
//!     { "uid": 100, "role": "primary", "port": 15100 },
//!     { "uid": 101, "role": "replica", "port": 15101 }
//!   ]
//! }
//! ```

mod errors;

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use errors::{ConfigError, ConfigResult};

use crate::gateway::GatewayOptions;
use crate::healthcheck::MonitorConfig;
use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::topology::{TabletAlias, TabletInfo, TabletType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_shard")]
    pub shard: String,

    #[serde(default = "default_cell")]
    pub cell: String,

    /// Probe interval per tablet (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub healthcheck_interval_ms: u64,

    /// Probe timeout, strictly below the interval (default: 500)
    #[serde(default = "default_timeout_ms")]
    pub healthcheck_timeout_ms: u64,

    /// Replica lag above which a replica is avoided (default: 30)
    #[serde(default = "default_max_replica_lag_secs")]
    pub max_replica_lag_secs: u64,

    #[serde(default)]
    pub http: HttpServerConfig,

    /// trace, info, warn, error or fatal (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub tablets: Vec<TabletConfig>,

    /// Tables created on every local tablet
    #[serde(default = "default_tables")]
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletConfig {
    pub uid: u32,
    pub role: TabletType,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// The first column is the primary key
    pub columns: Vec<String>,
}

fn default_keyspace() -> String {
    "commerce".to_string()
}
fn default_shard() -> String {
    "0".to_string()
}
fn default_cell() -> String {
    "zone1".to_string()
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_timeout_ms() -> u64 {
    500
}
fn default_max_replica_lag_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_hostname() -> String {
    "localhost".to_string()
}
fn default_tables() -> Vec<TableConfig> {
    vec![TableConfig {
        name: "customer".to_string(),
        columns: vec!["id".to_string(), "email".to_string()],
    }]
}

impl GatewayConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: GatewayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.healthcheck_interval_ms == 0 {
            return Err(ConfigError::invalid("healthcheck_interval_ms must be > 0"));
        }
        if self.healthcheck_timeout_ms >= self.healthcheck_interval_ms {
            return Err(ConfigError::invalid(format!(
                "healthcheck_timeout_ms ({}) must be below healthcheck_interval_ms ({})",
                self.healthcheck_timeout_ms, self.healthcheck_interval_ms
            )));
        }
        for (name, value) in [
            ("keyspace", &self.keyspace),
            ("shard", &self.shard),
            ("cell", &self.cell),
        ] {
            if value.is_empty() || value.contains('.') {
                return Err(ConfigError::invalid(format!(
                    "{} must be non-empty and must not contain '.': '{}'",
                    name, value
                )));
            }
        }
        self.severity()?;

        let primaries = self.tablets.iter().filter(|t| t.role.is_primary()).count();
        if primaries != 1 {
            return Err(ConfigError::invalid(format!(
                "exactly one primary tablet required, found {}",
                primaries
            )));
        }
        let mut uids = HashSet::new();
        for tablet in &self.tablets {
            if !uids.insert(tablet.uid) {
                return Err(ConfigError::invalid(format!("duplicate tablet uid {}", tablet.uid)));
            }
        }

        for table in &self.tables {
            if table.columns.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "table '{}' has no columns",
                    table.name
                )));
            }
        }
        Ok(())
    }

    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_millis(self.healthcheck_interval_ms),
            timeout: Duration::from_millis(self.healthcheck_timeout_ms),
        }
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            keyspace: self.keyspace.clone(),
            monitor: self.monitor_config(),
            max_replica_lag: Duration::from_secs(self.max_replica_lag_secs),
        }
    }

    /// Tablets described by this config, in declaration order
    pub fn tablet_infos(&self) -> Vec<TabletInfo> {
        self.tablets
            .iter()
            .map(|t| {
                TabletInfo::new(
                    TabletAlias::new(self.cell.clone(), t.uid),
                    self.keyspace.clone(),
                    self.shard.clone(),
                    t.hostname.clone(),
                    t.port,
                    t.role,
                )
            })
            .collect()
    }
}
