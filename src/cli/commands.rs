//! CLI command implementations
//!
//! `start` boot sequence:
//! 1. Load and validate config
//! 2. Build the local cluster and its tables
//! 3. Register every tablet with the gateway and start resolving
//! 4. Serve HTTP introspection in the background
//! 5. Run the SQL console on stdin until EOF, then shut down

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::config::GatewayConfig;
use crate::gateway::{Gateway, GatewayError};
use crate::http_server::HttpServer;
use crate::observability::{log_event, log_event_with_fields, Event, Logger, Severity};
use crate::tablet::LocalCluster;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Start { config } => start(&config),
        Command::Check { config } => check(&config),
    }
}

/// Summary printed by `check`
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub keyspace: String,
    pub shard: String,
    pub cell: String,
    pub healthcheck_interval_ms: u64,
    pub healthcheck_timeout_ms: u64,
    pub http: String,
    pub tablets: Vec<TabletSummary>,
}

#[derive(Debug, Serialize)]
pub struct TabletSummary {
    pub alias: String,
    pub role: String,
    pub address: String,
}

impl ConfigSummary {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            keyspace: config.keyspace.clone(),
            shard: config.shard.clone(),
            cell: config.cell.clone(),
            healthcheck_interval_ms: config.healthcheck_interval_ms,
            healthcheck_timeout_ms: config.healthcheck_timeout_ms,
            http: config.http.socket_addr(),
            tablets: config
                .tablet_infos()
                .into_iter()
                .map(|info| TabletSummary {
                    alias: info.alias.to_string(),
                    role: info.tablet_type.as_str().to_string(),
                    address: info.address(),
                })
                .collect(),
        }
    }
}

/// Validate a config file and print its summary
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = GatewayConfig::load(config_path)?;
    write_response(&ConfigSummary::from_config(&config))
}

/// Boot and serve until stdin closes
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = GatewayConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::boot_failed(format!("failed to start runtime: {}", e)))?;
    runtime.block_on(serve(config))
}

/// Build the gateway over a local cluster described by `config`
pub fn boot(config: &GatewayConfig) -> CliResult<(Arc<Gateway>, LocalCluster)> {
    log_event(Event::BootStart);

    let cluster = LocalCluster::new(config.tablet_infos());
    for table in &config.tables {
        let columns: Vec<&str> = table.columns.iter().map(String::as_str).collect();
        cluster
            .create_table(&table.name, &columns)
            .map_err(GatewayError::from)?;
    }

    let gateway = Arc::new(Gateway::new(config.gateway_options()));
    for tablet in cluster.tablets() {
        gateway.add_tablet(tablet.clone())?;
    }
    gateway.start();

    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("keyspace", &config.keyspace),
            ("tablets", &config.tablets.len().to_string()),
        ],
    );
    Ok((gateway, cluster))
}

async fn serve(config: GatewayConfig) -> CliResult<()> {
    let (gateway, _cluster) = boot(&config)?;

    let server = HttpServer::new(config.http.clone(), Arc::clone(&gateway));
    let http = tokio::spawn(async move {
        if let Err(e) = server.start().await {
            Logger::log(
                Severity::Error,
                "HTTP_SERVER_FAILED",
                &[("error", &e.to_string())],
            );
        }
    });

    log_event(Event::BootComplete);
    let console = run_console(&gateway).await;

    http.abort();
    gateway.shutdown().await;
    console
}

/// One session over stdin, one statement per line
async fn run_console(gateway: &Gateway) -> CliResult<()> {
    let mut session = gateway.open_session();
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let sql = line.trim();
        if sql.is_empty() {
            continue;
        }
        match gateway.execute(&mut session, sql).await {
            Ok(result) => write_response(&result)?,
            Err(e) => write_error(e.code(), &e.to_string())?,
        }
    }

    gateway.close_session(session).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use tempfile::NamedTempFile;

    use super::*;

    const CONFIG: &str = r#"{
        "healthcheck_interval_ms": 100,
        "healthcheck_timeout_ms": 50,
        "tablets": [
            {"uid": 100, "role": "primary", "port": 15100},
            {"uid": 101, "role": "replica", "port": 15101},
            {"uid": 102, "role": "replica", "port": 15102}
        ]
    }"#;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_check_valid_config() {
        let file = config_file(CONFIG);
        check(file.path()).unwrap();
    }

    #[test]
    fn test_check_invalid_config() {
        let file = config_file(r#"{"tablets": []}"#);
        let err = check(file.path()).unwrap_err();
        assert_eq!(err.code_str(), "TABLETGATE_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_summary() {
        let config = GatewayConfig::from_json(CONFIG).unwrap();
        let summary = ConfigSummary::from_config(&config);
        assert_eq!(summary.tablets.len(), 3);
        assert_eq!(summary.tablets[0].role, "PRIMARY");
        assert_eq!(summary.http, "0.0.0.0:15001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_registers_every_tablet() {
        let config = GatewayConfig::from_json(CONFIG).unwrap();
        let (gateway, cluster) = boot(&config).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cluster.tablets().len(), 3);
        assert_eq!(gateway.registry().count(), 3);
        assert_eq!(gateway.show_tablets().rows.len(), 3);
        gateway.shutdown().await;
    }
}
