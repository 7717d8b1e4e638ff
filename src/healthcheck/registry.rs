//! Health registry
//!
//! Process-wide table of the latest [`TabletHealth`] per tablet.
//!
//! - One entry per alias, replaced whole on every upsert
//! - At most one serving primary in any snapshot
//! - No I/O and no `.await` while the lock is held
//! - Every mutation bumps a generation published on a watch channel

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use super::TabletHealth;
use crate::observability::{log_event_with_fields, Event};
use crate::topology::{TabletAlias, TabletType};

/// Immutable copy of the registry, ordered by alias
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub generation: u64,
    entries: Vec<TabletHealth>,
}

impl RegistrySnapshot {
    pub fn entries(&self) -> &[TabletHealth] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TabletHealth> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, alias: &TabletAlias) -> Option<&TabletHealth> {
        self.entries.iter().find(|h| h.alias() == alias)
    }

    /// The serving primary, if there is one
    pub fn serving_primary(&self) -> Option<&TabletHealth> {
        self.entries.iter().find(|h| h.is_serving_primary())
    }

    /// Serving tablets currently in `role`
    pub fn serving(&self, role: TabletType) -> impl Iterator<Item = &TabletHealth> {
        self.entries
            .iter()
            .filter(move |h| h.serving && h.tablet_type == role)
    }
}

pub struct HealthRegistry {
    entries: RwLock<HashMap<TabletAlias, TabletHealth>>,
    generation: watch::Sender<u64>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            generation,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TabletAlias, TabletHealth>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TabletAlias, TabletHealth>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    /// Replace the entry for `status.alias()`, returning the previous one.
    ///
    /// If this would leave two serving primaries, the one with the older
    /// primary term is stored as not serving in the same critical section.
    pub fn upsert(&self, mut status: TabletHealth) -> Option<TabletHealth> {
        let mut demoted = None;
        let previous = {
            let mut entries = self.write();
            if status.is_serving_primary() {
                let rival = entries
                    .values_mut()
                    .find(|h| h.is_serving_primary() && h.alias() != status.alias());
                if let Some(rival) = rival {
                    // Newest term wins; on a tie the fresh report wins.
                    if rival.primary_term_start <= status.primary_term_start {
                        demote(rival, status.alias());
                        demoted = Some((rival.alias().clone(), status.alias().clone()));
                    } else {
                        demote(&mut status, rival.alias());
                        demoted = Some((status.alias().clone(), rival.alias().clone()));
                    }
                }
            }
            entries.insert(status.alias().clone(), status)
        };
        self.bump();

        if let Some((stale, current)) = demoted {
            log_event_with_fields(
                Event::DualPrimaryDemoted,
                &[
                    ("demoted", &stale.to_string()),
                    ("primary", &current.to_string()),
                ],
            );
        }
        previous
    }

    /// Delete the entry for `alias`
    pub fn remove(&self, alias: &TabletAlias) -> Option<TabletHealth> {
        let removed = self.write().remove(alias);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Latest status of one tablet
    pub fn get(&self, alias: &TabletAlias) -> Option<TabletHealth> {
        self.read().get(alias).cloned()
    }

    /// Copy of the whole table taken under one read lock
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut entries: Vec<TabletHealth> = {
            let map = self.read();
            map.values().cloned().collect()
        };
        entries.sort_by(|a, b| a.alias().cmp(b.alias()));
        RegistrySnapshot {
            generation: *self.generation.borrow(),
            entries,
        }
    }

    /// Number of serving tablets
    pub fn count(&self) -> usize {
        self.read().values().filter(|h| h.serving).count()
    }

    /// Number of known tablets, serving or not
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that changes on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn demote(health: &mut TabletHealth, superseded_by: &TabletAlias) {
    health.serving = false;
    health.last_error = Some(format!("superseded by primary {}", superseded_by));
}
