//! Replica monitor
//!
//! One tokio task per tablet. Every interval it probes the tablet, bounded by
//! a timeout shorter than the interval, and publishes the outcome to the
//! registry. A failed or timed-out probe is recorded as not serving and the
//! monitor keeps going at the same interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::{HealthRegistry, TabletHealth};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::tablet::{TabletBackend, TabletError};

/// Probe cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Always shorter than `interval`
    pub timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_millis(500),
        }
    }
}

/// A running monitor task
pub(crate) struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the task to stop and wait for it to exit
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

pub(crate) fn spawn_monitor(
    backend: Arc<dyn TabletBackend>,
    registry: Arc<HealthRegistry>,
    metrics: Arc<MetricsRegistry>,
    config: MonitorConfig,
) -> MonitorHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_monitor(backend, registry, metrics, config, shutdown_rx));
    MonitorHandle { shutdown, task }
}

async fn run_monitor(
    backend: Arc<dyn TabletBackend>,
    registry: Arc<HealthRegistry>,
    metrics: Arc<MetricsRegistry>,
    config: MonitorConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let alias = backend.info().alias.to_string();
    log_event_with_fields(
        Event::MonitorStarted,
        &[
            ("tablet", &alias),
            ("interval_ms", &config.interval.as_millis().to_string()),
        ],
    );

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let status = check(&*backend, &registry, &metrics, config.timeout).await;
                if *shutdown.borrow() {
                    break;
                }
                publish(&registry, status);
            }
        }
    }

    log_event_with_fields(Event::MonitorStopped, &[("tablet", &alias)]);
}

/// Probe once and classify the outcome. Never fails.
pub(crate) async fn check(
    backend: &dyn TabletBackend,
    registry: &HealthRegistry,
    metrics: &MetricsRegistry,
    probe_timeout: Duration,
) -> TabletHealth {
    let info = backend.info().clone();
    metrics.increment_probes_sent();

    let outcome = match timeout(probe_timeout, backend.probe()).await {
        Ok(result) => result,
        Err(_) => {
            metrics.increment_probe_timeouts();
            Err(TabletError::ProbeTimeout(info.alias.to_string()))
        }
    };

    match outcome {
        Ok(probe) => TabletHealth::from_probe(info, probe, Utc::now()),
        Err(error) => {
            metrics.increment_probe_failures();
            let previous = registry.get(&info.alias);
            let status = TabletHealth::from_failure(info, previous.as_ref(), &error, Utc::now());
            if previous.as_ref().and_then(|p| p.last_error.as_ref()) != status.last_error.as_ref() {
                log_event_with_fields(
                    Event::ProbeFailed,
                    &[
                        ("tablet", &status.alias().to_string()),
                        ("error", &error.to_string()),
                    ],
                );
            }
            status
        }
    }
}

/// Store `status` and log serving transitions
fn publish(registry: &HealthRegistry, status: TabletHealth) {
    let alias = status.alias().to_string();
    let role = status.tablet_type.as_str();
    let serving = status.serving;
    let was_serving = registry.upsert(status).map(|p| p.serving);

    if was_serving != Some(serving) {
        let event = if serving {
            Event::TabletServing
        } else {
            Event::TabletNotServing
        };
        log_event_with_fields(event, &[("tablet", &alias), ("role", role)]);
    }
}
