//! Configuration Loading Tests
//!
//! Config files on disk through `GatewayConfig::load` and the `check`
//! command.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use tabletgate::cli::{self, CliErrorCode};
use tabletgate::config::{ConfigError, GatewayConfig};
use tabletgate::topology::TabletType;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"{
            "keyspace": "commerce",
            "shard": "-80",
            "cell": "zone2",
            "healthcheck_interval_ms": 2000,
            "healthcheck_timeout_ms": 1500,
            "max_replica_lag_secs": 10,
            "http": {"host": "127.0.0.1", "port": 8080, "cors_origins": ["http://localhost:3000"]},
            "log_level": "warn",
            "tablets": [
                {"uid": 200, "role": "PRIMARY", "hostname": "db-a", "port": 15200},
                {"uid": 201, "role": "REPLICA", "hostname": "db-b", "port": 15201}
            ],
            "tables": [{"name": "orders", "columns": ["order_id", "customer_id"]}]
        }"#,
    );

    let config = GatewayConfig::load(file.path()).unwrap();
    assert_eq!(config.shard, "-80");
    assert_eq!(config.http.socket_addr(), "127.0.0.1:8080");

    let monitor = config.monitor_config();
    assert_eq!(monitor.interval, Duration::from_millis(2000));
    assert_eq!(monitor.timeout, Duration::from_millis(1500));
    assert_eq!(
        config.gateway_options().max_replica_lag,
        Duration::from_secs(10)
    );

    let infos = config.tablet_infos();
    assert_eq!(infos[0].alias.to_string(), "zone2-0000000200");
    assert_eq!(infos[0].tablet_type, TabletType::Primary);
    assert_eq!(infos[1].address(), "db-b:15201");
}

#[test]
fn test_load_rejects_invalid_file() {
    let file = write_config(
        r#"{"healthcheck_timeout_ms": 1000, "tablets": [{"uid": 1, "role": "primary", "port": 1}]}"#,
    );
    assert!(matches!(
        GatewayConfig::load(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_rejects_unknown_role() {
    let file = write_config(r#"{"tablets": [{"uid": 1, "role": "rdonly", "port": 1}]}"#);
    assert!(matches!(
        GatewayConfig::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_check_command() {
    let good = write_config(r#"{"tablets": [{"uid": 1, "role": "primary", "port": 1}]}"#);
    cli::check(good.path()).unwrap();

    let bad = write_config("not json");
    let err = cli::check(bad.path()).unwrap_err();
    assert_eq!(err.code(), CliErrorCode::ConfigError);
    assert_eq!(err.exit_code(), 2);
}
