//! `/debug/vars` schema

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::healthcheck::{RegistrySnapshot, TabletHealth};
use crate::observability::MetricsSnapshot;
use crate::resolver::ReloadCountersSnapshot;
use crate::topology::TabletType;

/// Everything exported on `/debug/vars`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugVars {
    #[serde(rename = "VtgateVSchemaCounts")]
    pub vschema_counts: ReloadCountersSnapshot,
    /// Keyed `<keyspace>.<shard>.<ROLE>.<alias>`
    #[serde(rename = "HealthcheckConnections")]
    pub connections: BTreeMap<String, ConnectionDescriptor>,
    #[serde(rename = "HealthcheckServing")]
    pub serving: ServingCounts,
    #[serde(rename = "GatewayCounters")]
    pub counters: MetricsSnapshot,
}

impl DebugVars {
    pub fn collect(
        snapshot: &RegistrySnapshot,
        vschema_counts: ReloadCountersSnapshot,
        counters: MetricsSnapshot,
    ) -> Self {
        let connections = snapshot
            .iter()
            .map(|h| (h.connection_key(), ConnectionDescriptor::from(h)))
            .collect();
        let serving = ServingCounts {
            primary: snapshot.serving(TabletType::Primary).count(),
            replica: snapshot.serving(TabletType::Replica).count(),
        };
        Self {
            vschema_counts,
            connections,
            serving,
            counters,
        }
    }
}

/// One health-check connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionDescriptor {
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    pub serving: bool,
    pub lag_seconds: f64,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&TabletHealth> for ConnectionDescriptor {
    fn from(health: &TabletHealth) -> Self {
        Self {
            alias: health.info.alias.to_string(),
            hostname: health.info.hostname.clone(),
            port: health.info.port,
            serving: health.serving,
            lag_seconds: health.lag_seconds,
            last_check: health.last_check,
            last_error: health.last_error.clone(),
        }
    }
}

/// Serving tablets per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServingCounts {
    pub primary: usize,
    pub replica: usize,
}
