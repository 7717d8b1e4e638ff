//! `show vitess_tablets` rows

use chrono::SecondsFormat;
use serde::Serialize;

use crate::healthcheck::TabletHealth;

/// One row of `show vitess_tablets`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TabletRow {
    pub cell: String,
    pub keyspace: String,
    pub shard: String,
    pub tablet_type: String,
    pub state: String,
    pub alias: String,
    pub hostname: String,
    /// RFC 3339, empty unless the tablet is a primary
    pub primary_term_start_time: String,
}

impl TabletRow {
    pub const COLUMNS: [&'static str; 8] = [
        "Cell",
        "Keyspace",
        "Shard",
        "TabletType",
        "State",
        "Alias",
        "Hostname",
        "PrimaryTermStartTime",
    ];

    pub fn from_health(health: &TabletHealth) -> Self {
        Self {
            cell: health.info.alias.cell.clone(),
            keyspace: health.info.keyspace.clone(),
            shard: health.info.shard.clone(),
            tablet_type: health.tablet_type.as_str().to_string(),
            state: health.state_str().to_string(),
            alias: health.info.alias.to_string(),
            hostname: health.info.hostname.clone(),
            primary_term_start_time: health
                .primary_term_start
                .filter(|_| health.tablet_type.is_primary())
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
        }
    }

    /// Values in [`TabletRow::COLUMNS`] order
    pub fn into_values(self) -> Vec<String> {
        vec![
            self.cell,
            self.keyspace,
            self.shard,
            self.tablet_type,
            self.state,
            self.alias,
            self.hostname,
            self.primary_term_start_time,
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::topology::{TabletAlias, TabletInfo, TabletType};

    fn health(tablet_type: TabletType) -> TabletHealth {
        let info = TabletInfo::new(
            TabletAlias::new("zone1", 100),
            "commerce",
            "0",
            "localhost",
            15100,
            tablet_type,
        );
        let mut h = TabletHealth::pending(info, Utc::now());
        h.serving = true;
        h.primary_term_start = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        h
    }

    #[test]
    fn test_primary_row() {
        let row = TabletRow::from_health(&health(TabletType::Primary)).into_values();
        assert_eq!(
            row,
            vec![
                "zone1",
                "commerce",
                "0",
                "PRIMARY",
                "SERVING",
                "zone1-0000000100",
                "localhost",
                "2024-03-01T12:00:00Z"
            ]
        );
    }

    #[test]
    fn test_replica_has_no_term_start() {
        let row = TabletRow::from_health(&health(TabletType::Replica));
        assert_eq!(row.tablet_type, "REPLICA");
        assert_eq!(row.primary_term_start_time, "");
    }

    #[test]
    fn test_columns_match_values() {
        let row = TabletRow::from_health(&health(TabletType::Primary));
        assert_eq!(row.into_values().len(), TabletRow::COLUMNS.len());
    }
}
