//! Per-tablet health status
//!
//! A [`TabletHealth`] is produced by exactly one monitor and published to the
//! registry as a whole value. Readers only ever see complete statuses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tablet::{ProbeResponse, TabletError};
use crate::topology::{TabletAlias, TabletInfo, TabletType};

/// Last observed health of one tablet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabletHealth {
    pub info: TabletInfo,
    /// Role the tablet reported on its last successful probe
    pub tablet_type: TabletType,
    pub serving: bool,
    pub last_check: DateTime<Utc>,
    pub lag_seconds: f64,
    pub primary_term_start: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TabletHealth {
    /// Status of a tablet that has not been probed yet
    pub fn pending(info: TabletInfo, now: DateTime<Utc>) -> Self {
        let tablet_type = info.tablet_type;
        Self {
            info,
            tablet_type,
            serving: false,
            last_check: now,
            lag_seconds: 0.0,
            primary_term_start: None,
            last_error: None,
        }
    }

    /// Status from a probe that answered
    pub fn from_probe(info: TabletInfo, probe: ProbeResponse, now: DateTime<Utc>) -> Self {
        let primary_term_start = if probe.tablet_type.is_primary() {
            probe.primary_term_start
        } else {
            None
        };
        Self {
            info,
            tablet_type: probe.tablet_type,
            serving: probe.serving,
            last_check: now,
            lag_seconds: probe.replication_lag_seconds.max(0.0),
            primary_term_start,
            last_error: None,
        }
    }

    /// Status from a probe that failed or timed out.
    ///
    /// The role is carried over from `previous` since the tablet could not tell.
    pub fn from_failure(
        info: TabletInfo,
        previous: Option<&TabletHealth>,
        error: &TabletError,
        now: DateTime<Utc>,
    ) -> Self {
        let tablet_type = previous.map_or(info.tablet_type, |p| p.tablet_type);
        Self {
            info,
            tablet_type,
            serving: false,
            last_check: now,
            lag_seconds: previous.map_or(0.0, |p| p.lag_seconds),
            primary_term_start: previous.and_then(|p| p.primary_term_start),
            last_error: Some(error.to_string()),
        }
    }

    pub fn alias(&self) -> &TabletAlias {
        &self.info.alias
    }

    pub fn is_serving_primary(&self) -> bool {
        self.serving && self.tablet_type.is_primary()
    }

    /// Introspection key: `<keyspace>.<shard>.<ROLE>.<alias>`
    pub fn connection_key(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.info.keyspace,
            self.info.shard,
            self.tablet_type.as_str(),
            self.info.alias
        )
    }

    /// `SERVING` or `NOT_SERVING`
    pub fn state_str(&self) -> &'static str {
        if self.serving {
            "SERVING"
        } else {
            "NOT_SERVING"
        }
    }
}
