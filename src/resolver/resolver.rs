//! Role resolver
//!
//! Turns registry snapshots into routing answers: who the primary is, and
//! which replica a read should go to. It also tracks the topology signature
//! (alias -> role of every present tablet) and counts a reload each time
//! that signature changes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ReloadCounters, ReloadCountersSnapshot};
use crate::healthcheck::{HealthRegistry, RegistrySnapshot, TabletHealth};
use crate::observability::{log_event_with_fields, Event};
use crate::topology::{TabletAlias, TabletType};

#[derive(Debug, Default)]
struct Topology {
    /// `None` until the first snapshot is processed
    signature: Option<BTreeMap<TabletAlias, TabletType>>,
    malformed: BTreeSet<TabletAlias>,
}

pub struct RoleResolver {
    registry: Arc<HealthRegistry>,
    counters: ReloadCounters,
    topology: Mutex<Topology>,
    max_replica_lag: Duration,
}

impl RoleResolver {
    pub fn new(registry: Arc<HealthRegistry>, max_replica_lag: Duration) -> Self {
        Self {
            registry,
            counters: ReloadCounters::new(),
            topology: Mutex::new(Topology::default()),
            max_replica_lag,
        }
    }

    pub fn counters(&self) -> ReloadCountersSnapshot {
        self.counters.snapshot()
    }

    pub fn max_replica_lag(&self) -> Duration {
        self.max_replica_lag
    }

    /// Re-read the registry. Returns true if the topology changed.
    pub fn refresh(&self) -> bool {
        self.process(&self.registry.snapshot())
    }

    /// Process one snapshot. The first one always counts as a reload.
    pub fn process(&self, snapshot: &RegistrySnapshot) -> bool {
        let mut signature = BTreeMap::new();
        let mut malformed = Vec::new();
        for health in snapshot.iter() {
            if let Err(reason) = validate(health) {
                malformed.push((health.alias().clone(), reason));
                continue;
            }
            signature.insert(health.alias().clone(), health.tablet_type);
        }

        let (changed, newly_malformed) = {
            let mut topology = match self.topology.lock() {
                Ok(topology) => topology,
                Err(poisoned) => poisoned.into_inner(),
            };
            let newly_malformed: Vec<_> = malformed
                .into_iter()
                .filter(|(alias, _)| topology.malformed.insert(alias.clone()))
                .collect();
            topology
                .malformed
                .retain(|alias| snapshot.get(alias).is_some_and(|h| validate(h).is_err()));

            let changed = topology.signature.as_ref() != Some(&signature);
            if changed {
                topology.signature = Some(signature);
            }
            (changed, newly_malformed)
        };

        for (alias, reason) in newly_malformed {
            self.record_parsing_error(&alias, &reason);
        }
        if changed {
            self.counters.increment_reload();
            log_event_with_fields(
                Event::TopologyReload,
                &[
                    ("generation", &snapshot.generation.to_string()),
                    ("tablets", &snapshot.len().to_string()),
                ],
            );
        }
        changed
    }

    /// The watch feeding this resolver failed
    pub fn record_watch_error(&self, reason: &str) {
        self.counters.increment_watch_error();
        log_event_with_fields(Event::WatchError, &[("error", reason)]);
    }

    /// A tablet's metadata could not be turned into a routing entry
    pub fn record_parsing_error(&self, alias: &TabletAlias, reason: &str) {
        self.counters.increment_parsing();
        log_event_with_fields(
            Event::ParsingError,
            &[("tablet", &alias.to_string()), ("error", reason)],
        );
    }

    /// Alias of the unique serving primary
    pub fn primary_identity(&self) -> Option<TabletAlias> {
        self.registry
            .snapshot()
            .serving_primary()
            .map(|h| h.alias().clone())
    }

    /// Routing target for `role` in `snapshot`.
    ///
    /// Replicas are ranked by lag then alias. Only replicas within
    /// `max_replica_lag` are eligible unless none are, in which case the
    /// least-lagged serving replica is used.
    pub fn pick<'a>(
        &self,
        role: TabletType,
        snapshot: &'a RegistrySnapshot,
    ) -> Option<&'a TabletHealth> {
        match role {
            TabletType::Primary => snapshot.serving_primary(),
            TabletType::Replica => {
                let max_lag = self.max_replica_lag.as_secs_f64();
                let mut replicas: Vec<&TabletHealth> =
                    snapshot.serving(TabletType::Replica).collect();
                replicas.sort_by(|a, b| {
                    a.lag_seconds
                        .total_cmp(&b.lag_seconds)
                        .then_with(|| a.alias().cmp(b.alias()))
                });
                replicas
                    .iter()
                    .find(|h| h.lag_seconds <= max_lag)
                    .or_else(|| replicas.first())
                    .copied()
            }
        }
    }

    /// Keep refreshing on every registry change until `shutdown` is called
    pub fn spawn(self: &Arc<Self>) -> ResolverHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let changes = self.registry.subscribe();
        let task = tokio::spawn(run_resolver(Arc::clone(self), changes, shutdown_rx));
        ResolverHandle { shutdown, task }
    }
}

/// Keyspace and shard end up in dotted introspection keys
fn validate(health: &TabletHealth) -> Result<(), String> {
    for (name, value) in [("keyspace", &health.info.keyspace), ("shard", &health.info.shard)] {
        if value.is_empty() {
            return Err(format!("empty {}", name));
        }
        if value.contains('.') {
            return Err(format!("{} '{}' contains '.'", name, value));
        }
    }
    Ok(())
}

pub struct ResolverHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ResolverHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn run_resolver(
    resolver: Arc<RoleResolver>,
    mut changes: watch::Receiver<u64>,
    mut shutdown: watch::Receiver<bool>,
) {
    changes.borrow_and_update();
    resolver.refresh();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            changed = changes.changed() => match changed {
                Ok(()) => {
                    changes.borrow_and_update();
                    resolver.refresh();
                }
                Err(_) => {
                    resolver.record_watch_error("registry watch closed");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::topology::TabletInfo;

    fn health(uid: u32, tablet_type: TabletType, serving: bool, lag: f64) -> TabletHealth {
        let info = TabletInfo::new(
            TabletAlias::new("zone1", uid),
            "commerce",
            "0",
            "localhost",
            15000 + uid as u16,
            tablet_type,
        );
        let mut h = TabletHealth::pending(info, Utc::now());
        h.serving = serving;
        h.lag_seconds = lag;
        h
    }

    fn resolver() -> (Arc<HealthRegistry>, RoleResolver) {
        let registry = Arc::new(HealthRegistry::new());
        let resolver = RoleResolver::new(Arc::clone(&registry), Duration::from_secs(30));
        (registry, resolver)
    }

    #[test]
    fn test_first_snapshot_counts_as_reload() {
        let (_registry, resolver) = resolver();
        assert!(resolver.refresh());
        assert_eq!(resolver.counters().reload, 1);
        assert!(!resolver.refresh());
        assert_eq!(resolver.counters().reload, 1);
    }

    #[test]
    fn test_reload_on_role_flip_not_on_serving_change() {
        let (registry, resolver) = resolver();
        registry.upsert(health(100, TabletType::Primary, true, 0.0));
        registry.upsert(health(101, TabletType::Replica, true, 0.0));
        resolver.refresh();

        registry.upsert(health(101, TabletType::Replica, false, 0.0));
        assert!(!resolver.refresh());

        registry.upsert(health(101, TabletType::Primary, true, 0.0));
        assert!(resolver.refresh());
        assert_eq!(resolver.counters().reload, 2);
    }

    #[test]
    fn test_reload_on_tablet_removed() {
        let (registry, resolver) = resolver();
        registry.upsert(health(101, TabletType::Replica, true, 0.0));
        resolver.refresh();
        registry.remove(&TabletAlias::new("zone1", 101));
        assert!(resolver.refresh());
    }

    #[test]
    fn test_primary_identity() {
        let (registry, resolver) = resolver();
        assert_eq!(resolver.primary_identity(), None);

        registry.upsert(health(100, TabletType::Primary, true, 0.0));
        assert_eq!(resolver.primary_identity(), Some(TabletAlias::new("zone1", 100)));

        registry.upsert(health(100, TabletType::Primary, false, 0.0));
        assert_eq!(resolver.primary_identity(), None);
    }

    #[test]
    fn test_pick_replica_prefers_lowest_lag_then_alias() {
        let (registry, resolver) = resolver();
        registry.upsert(health(103, TabletType::Replica, true, 2.0));
        registry.upsert(health(102, TabletType::Replica, true, 1.0));
        registry.upsert(health(101, TabletType::Replica, true, 1.0));
        registry.upsert(health(104, TabletType::Replica, false, 0.0));

        let snapshot = registry.snapshot();
        let picked = resolver.pick(TabletType::Replica, &snapshot).unwrap();
        assert_eq!(picked.alias().uid, 101);
    }

    #[test]
    fn test_pick_replica_falls_back_when_all_lagging() {
        let (registry, resolver) = resolver();
        registry.upsert(health(101, TabletType::Replica, true, 90.0));
        registry.upsert(health(102, TabletType::Replica, true, 45.0));

        let snapshot = registry.snapshot();
        assert_eq!(
            resolver.pick(TabletType::Replica, &snapshot).map(|h| h.alias().uid),
            Some(102)
        );
    }

    #[test]
    fn test_pick_none_when_nothing_serving() {
        let (registry, resolver) = resolver();
        registry.upsert(health(100, TabletType::Primary, false, 0.0));
        let snapshot = registry.snapshot();
        assert!(resolver.pick(TabletType::Primary, &snapshot).is_none());
        assert!(resolver.pick(TabletType::Replica, &snapshot).is_none());
    }

    #[test]
    fn test_malformed_tablet_counted_once() {
        let (registry, resolver) = resolver();
        let mut bad = health(101, TabletType::Replica, true, 0.0);
        bad.info.keyspace = "com.merce".to_string();
        registry.upsert(bad);

        resolver.refresh();
        resolver.refresh();
        let counters = resolver.counters();
        assert_eq!(counters.parsing, 1);
        assert_eq!(counters.watch_error, 0);
    }

    async fn wait_for_reloads(resolver: &RoleResolver, expected: u64) {
        for _ in 0..100 {
            if resolver.counters().reload >= expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_background_task_follows_registry() {
        let (registry, resolver) = resolver();
        let resolver = Arc::new(resolver);
        let handle = resolver.spawn();

        wait_for_reloads(&resolver, 1).await;
        registry.upsert(health(100, TabletType::Primary, true, 0.0));
        wait_for_reloads(&resolver, 2).await;
        assert_eq!(resolver.counters().reload, 2);

        handle.stop().await;
        assert_eq!(resolver.counters().watch_error, 0);
    }
}
