//! Health check lifecycle
//!
//! [`HealthCheck`] owns the registry, the backend handles and one monitor per
//! tablet. Tablets are added and removed at runtime; removal stops the
//! monitor, waits for it, and only then deletes the registry entry so a late
//! probe can never resurrect it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use futures_util::future::join_all;

use super::errors::{HealthCheckError, HealthCheckResult};
use super::monitor::{spawn_monitor, MonitorConfig, MonitorHandle};
use super::{HealthRegistry, TabletHealth};
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::tablet::TabletBackend;
use crate::topology::TabletAlias;

pub struct HealthCheck {
    registry: Arc<HealthRegistry>,
    metrics: Arc<MetricsRegistry>,
    config: MonitorConfig,
    backends: RwLock<HashMap<TabletAlias, Arc<dyn TabletBackend>>>,
    monitors: Mutex<HashMap<TabletAlias, MonitorHandle>>,
    shut_down: AtomicBool,
}

impl HealthCheck {
    pub fn new(config: MonitorConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            registry: Arc::new(HealthRegistry::new()),
            metrics,
            config,
            backends: RwLock::new(HashMap::new()),
            monitors: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> Arc<HealthRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> MonitorConfig {
        self.config
    }

    /// Start monitoring a tablet.
    ///
    /// The tablet is listed as not serving until its first probe answers.
    /// Must be called from within a tokio runtime.
    pub fn add_tablet(&self, backend: Arc<dyn TabletBackend>) -> HealthCheckResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(HealthCheckError::ShutDown);
        }
        let info = backend.info().clone();
        let mut monitors = self.lock_monitors();
        if monitors.contains_key(&info.alias) {
            return Err(HealthCheckError::DuplicateTablet(info.alias));
        }

        self.write_backends()
            .insert(info.alias.clone(), Arc::clone(&backend));
        self.registry
            .upsert(TabletHealth::pending(info.clone(), Utc::now()));

        let handle = spawn_monitor(
            backend,
            Arc::clone(&self.registry),
            Arc::clone(&self.metrics),
            self.config,
        );
        monitors.insert(info.alias, handle);
        Ok(())
    }

    /// Stop monitoring a tablet and forget it
    pub async fn remove_tablet(&self, alias: &TabletAlias) -> HealthCheckResult<()> {
        let handle = self
            .lock_monitors()
            .remove(alias)
            .ok_or_else(|| HealthCheckError::UnknownTablet(alias.clone()))?;

        handle.stop().await;
        self.write_backends().remove(alias);
        self.registry.remove(alias);
        Ok(())
    }

    /// Backend handle for routing
    pub fn backend(&self, alias: &TabletAlias) -> Option<Arc<dyn TabletBackend>> {
        self.read_backends().get(alias).cloned()
    }

    /// Aliases of every monitored tablet, sorted
    pub fn tablets(&self) -> Vec<TabletAlias> {
        let mut aliases: Vec<TabletAlias> = self.lock_monitors().keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Stop every monitor. Registry entries are kept as last observed.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log_event(Event::ShutdownStart);

        let handles: Vec<MonitorHandle> =
            self.lock_monitors().drain().map(|(_, h)| h).collect();
        join_all(handles.into_iter().map(MonitorHandle::stop)).await;

        log_event(Event::ShutdownComplete);
    }

    // Maps are only ever changed by whole inserts and removals, so a
    // poisoned guard still holds a consistent map.

    fn lock_monitors(&self) -> MutexGuard<'_, HashMap<TabletAlias, MonitorHandle>> {
        self.monitors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_backends(&self) -> RwLockReadGuard<'_, HashMap<TabletAlias, Arc<dyn TabletBackend>>> {
        self.backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_backends(&self) -> RwLockWriteGuard<'_, HashMap<TabletAlias, Arc<dyn TabletBackend>>> {
        self.backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
