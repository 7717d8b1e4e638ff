//! Statement routing
//!
//! The gateway owns health checking and role resolution and routes each
//! session's statements:
//!
//! - session control (`use`, `begin`, `commit`, `rollback`) is handled here
//! - inside a transaction every statement goes to the pinned tablet and
//!   backend transaction, whatever the registry says meanwhile
//! - outside a transaction statements go to the tablet the resolver picks
//!   for the session's target role, from the current registry snapshot
//! - writes to replica targets are rejected before reaching any tablet

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::errors::{GatewayError, GatewayResult};
use super::statement::{classify, Classified};
use crate::exporter::{DebugVars, TabletRow};
use crate::healthcheck::{HealthCheck, HealthRegistry, MonitorConfig};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::query::QueryResult;
use crate::resolver::{ResolverHandle, RoleResolver};
use crate::session::{Pin, Session, Target};
use crate::tablet::{TabletBackend, TabletError};
use crate::topology::{TabletAlias, TabletType};

/// Gateway settings
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOptions {
    /// Keyspace served by this gateway
    pub keyspace: String,
    pub monitor: MonitorConfig,
    /// Replicas lagging more than this are only used when nothing better serves
    pub max_replica_lag: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            keyspace: "commerce".to_string(),
            monitor: MonitorConfig::default(),
            max_replica_lag: Duration::from_secs(30),
        }
    }
}

pub struct Gateway {
    keyspace: String,
    metrics: Arc<MetricsRegistry>,
    health_check: HealthCheck,
    registry: Arc<HealthRegistry>,
    resolver: Arc<RoleResolver>,
    resolver_task: Mutex<Option<ResolverHandle>>,
}

impl Gateway {
    pub fn new(options: GatewayOptions) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let health_check = HealthCheck::new(options.monitor, Arc::clone(&metrics));
        let registry = health_check.registry();
        let resolver = Arc::new(RoleResolver::new(
            Arc::clone(&registry),
            options.max_replica_lag,
        ));
        Self {
            keyspace: options.keyspace,
            metrics,
            health_check,
            registry,
            resolver,
            resolver_task: Mutex::new(None),
        }
    }

    /// Start following registry changes. Must be called from within a tokio runtime.
    pub fn start(&self) {
        if let Ok(mut task) = self.resolver_task.lock() {
            if task.is_none() {
                *task = Some(self.resolver.spawn());
            }
        }
    }

    /// Stop the resolver and every monitor
    pub async fn shutdown(&self) {
        let task = self.resolver_task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.stop().await;
        }
        self.health_check.shutdown().await;
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn registry(&self) -> &HealthRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    pub fn health_check(&self) -> &HealthCheck {
        &self.health_check
    }

    // ==================
    // Tablets
    // ==================

    pub fn add_tablet(&self, backend: Arc<dyn TabletBackend>) -> GatewayResult<()> {
        Ok(self.health_check.add_tablet(backend)?)
    }

    pub async fn remove_tablet(&self, alias: &TabletAlias) -> GatewayResult<()> {
        Ok(self.health_check.remove_tablet(alias).await?)
    }

    // ==================
    // Sessions
    // ==================

    pub fn open_session(&self) -> Session {
        let session = Session::new();
        log_event_with_fields(
            Event::SessionOpened,
            &[("session", &session.connection_id().to_string())],
        );
        session
    }

    /// Roll back anything still open and drop the session
    pub async fn close_session(&self, mut session: Session) {
        let _ = self.rollback(&mut session).await;
        log_event_with_fields(
            Event::SessionClosed,
            &[("session", &session.connection_id().to_string())],
        );
    }

    /// Execute one statement for `session`
    pub async fn execute(&self, session: &mut Session, sql: &str) -> GatewayResult<QueryResult> {
        let result = match classify(sql) {
            Ok(Classified::ShowTablets) => Ok(self.show_tablets()),
            Ok(Classified::Use(target)) => self.use_target(session, target),
            Ok(Classified::Begin) => self.begin(session).await,
            Ok(Classified::Commit) => self.commit(session).await,
            Ok(Classified::Rollback) => self.rollback(session).await,
            Ok(Classified::Query { write }) => self.route(session, sql, write).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if rejected_locally(e) {
                self.metrics.increment_statements_rejected();
                log_event_with_fields(
                    Event::StatementRejected,
                    &[
                        ("session", &session.connection_id().to_string()),
                        ("code", e.code()),
                        ("error", &e.to_string()),
                    ],
                );
            }
        }
        result
    }

    /// One row per known tablet, ordered by alias
    pub fn show_tablets(&self) -> QueryResult {
        let rows = self
            .registry
            .snapshot()
            .iter()
            .map(|health| TabletRow::from_health(health).into_values())
            .collect();
        QueryResult::text(&TabletRow::COLUMNS, rows)
    }

    /// Introspection variables
    pub fn debug_vars(&self) -> DebugVars {
        DebugVars::collect(
            &self.registry.snapshot(),
            self.resolver.counters(),
            self.metrics.snapshot(),
        )
    }

    fn use_target(&self, session: &mut Session, target: Target) -> GatewayResult<QueryResult> {
        if let Some(keyspace) = &target.keyspace {
            if keyspace != &self.keyspace {
                return Err(GatewayError::UnknownKeyspace(keyspace.clone()));
            }
        }
        session.set_target(target);
        Ok(QueryResult::empty())
    }

    /// Tablet the resolver picks for `role` right now
    fn pick_backend(&self, role: TabletType) -> GatewayResult<(TabletAlias, Arc<dyn TabletBackend>)> {
        let snapshot = self.registry.snapshot();
        let alias = match self.resolver.pick(role, &snapshot) {
            Some(health) => health.alias().clone(),
            None if role.is_primary() => return Err(GatewayError::NoPrimaryAvailable),
            None => return Err(GatewayError::NoReplicaAvailable),
        };
        let backend = self
            .health_check
            .backend(&alias)
            .ok_or_else(|| GatewayError::UnknownTablet(alias.clone()))?;
        Ok((alias, backend))
    }

    fn pinned_backend(&self, pin: &Pin) -> GatewayResult<Arc<dyn TabletBackend>> {
        self.health_check
            .backend(&pin.alias)
            .ok_or_else(|| GatewayError::PinnedTabletGone(pin.alias.clone()))
    }

    async fn begin(&self, session: &mut Session) -> GatewayResult<QueryResult> {
        // An open transaction is committed first, as MySQL does
        if session.in_transaction() {
            self.commit(session).await?;
        }

        let role = session.target().role;
        let (alias, backend) = self.pick_backend(role)?;
        let transaction = backend.begin().await?;
        let pin = Pin {
            alias,
            transaction,
            role,
        };
        log_event_with_fields(
            Event::TransactionPinned,
            &[
                ("session", &session.connection_id().to_string()),
                ("tablet", &pin.alias.to_string()),
                ("transaction", &pin.transaction.to_string()),
            ],
        );
        session.enter(pin);
        self.metrics.increment_transactions_begun();
        Ok(QueryResult::empty())
    }

    async fn commit(&self, session: &mut Session) -> GatewayResult<QueryResult> {
        let Some(pin) = session.pin().cloned() else {
            return Ok(QueryResult::empty());
        };
        let backend = self.pinned_backend(&pin)?;

        // The pin outlives a failed commit so the client can still roll back
        backend.commit(pin.transaction).await?;
        session.release();
        self.log_released(session, &pin, "commit");
        self.metrics.increment_transactions_committed();
        Ok(QueryResult::empty())
    }

    async fn rollback(&self, session: &mut Session) -> GatewayResult<QueryResult> {
        let Some(pin) = session.release() else {
            return Ok(QueryResult::empty());
        };
        self.metrics.increment_transactions_rolled_back();
        self.log_released(session, &pin, "rollback");

        // A vanished tablet took the transaction with it
        if let Some(backend) = self.health_check.backend(&pin.alias) {
            match backend.rollback(pin.transaction).await {
                Ok(()) | Err(TabletError::UnknownTransaction(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(QueryResult::empty())
    }

    async fn route(&self, session: &mut Session, sql: &str, write: bool) -> GatewayResult<QueryResult> {
        if let Some(pin) = session.pin() {
            if write && !pin.role.accepts_writes() {
                return Err(GatewayError::ReadOnlyTarget(Target::role(pin.role).to_string()));
            }
            let backend = self.pinned_backend(pin)?;
            self.metrics.increment_statements_routed();
            return Ok(backend.execute(Some(pin.transaction), sql).await?);
        }

        let role = session.target().role;
        if write && !role.accepts_writes() {
            return Err(GatewayError::ReadOnlyTarget(session.target().to_string()));
        }
        let (_, backend) = self.pick_backend(role)?;
        self.metrics.increment_statements_routed();
        Ok(backend.execute(None, sql).await?)
    }

    fn log_released(&self, session: &Session, pin: &Pin, outcome: &str) {
        log_event_with_fields(
            Event::TransactionReleased,
            &[
                ("session", &session.connection_id().to_string()),
                ("tablet", &pin.alias.to_string()),
                ("transaction", &pin.transaction.to_string()),
                ("outcome", outcome),
            ],
        );
    }
}

/// Errors raised by the gateway itself before any tablet saw the statement
fn rejected_locally(error: &GatewayError) -> bool {
    matches!(
        error,
        GatewayError::NoPrimaryAvailable
            | GatewayError::NoReplicaAvailable
            | GatewayError::ReadOnlyTarget(_)
            | GatewayError::UnsupportedStatement(_)
            | GatewayError::UnknownKeyspace(_)
            | GatewayError::InvalidTarget(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tablet::MemoryTablet;
    use crate::topology::TabletInfo;

    fn tablet(uid: u32, tablet_type: TabletType) -> Arc<MemoryTablet> {
        let tablet = Arc::new(MemoryTablet::new(TabletInfo::new(
            TabletAlias::new("zone1", uid),
            "commerce",
            "0",
            "localhost",
            15000 + uid as u16,
            tablet_type,
        )));
        tablet.create_table("customer", &["id", "email"]).unwrap();
        tablet
    }

    async fn cluster() -> (Gateway, Arc<MemoryTablet>, Arc<MemoryTablet>) {
        let gateway = Gateway::new(GatewayOptions::default());
        let primary = tablet(100, TabletType::Primary);
        let replica = tablet(101, TabletType::Replica);
        primary.attach_replica(Arc::clone(&replica));
        gateway.add_tablet(primary.clone()).unwrap();
        gateway.add_tablet(replica.clone()).unwrap();
        gateway.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        (gateway, primary, replica)
    }

    #[tokio::test(start_paused = true)]
    async fn test_use_replica_routes_reads_and_rejects_writes() {
        let (gateway, _primary, _replica) = cluster().await;
        let mut session = gateway.open_session();

        gateway
            .execute(&mut session, "insert into customer(id, email) values(1,'a')")
            .await
            .unwrap();
        gateway.execute(&mut session, "use @replica").await.unwrap();

        let rows = gateway
            .execute(&mut session, "select id from customer")
            .await
            .unwrap();
        assert_eq!(rows.rows_string(), "[[INT64(1)]]");

        let err = gateway
            .execute(&mut session, "delete from customer where id = 1")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::ReadOnlyTarget("@replica".to_string()));
        assert_eq!(gateway.metrics().snapshot().statements_rejected, 1);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_pins_and_commit_releases() {
        let (gateway, _primary, replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "use @replica").await.unwrap();

        gateway.execute(&mut session, "begin").await.unwrap();
        let pin = session.pin().cloned().unwrap();
        assert_eq!(pin.alias, TabletAlias::new("zone1", 101));
        assert_eq!(replica.open_transactions(), 1);

        gateway.execute(&mut session, "commit").await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(replica.open_transactions(), 0);

        let counters = gateway.metrics().snapshot();
        assert_eq!(counters.transactions_begun, 1);
        assert_eq!(counters.transactions_committed, 1);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_and_rollback_when_idle_are_noops() {
        let (gateway, _primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "commit").await.unwrap();
        gateway.execute(&mut session, "rollback").await.unwrap();
        assert_eq!(gateway.metrics().snapshot().transactions_committed, 0);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_while_pinned_commits_first() {
        let (gateway, primary, _replica) = cluster().await;
        let mut session = gateway.open_session();

        gateway.execute(&mut session, "begin").await.unwrap();
        gateway
            .execute(&mut session, "insert into customer(id, email) values(1,'a')")
            .await
            .unwrap();
        gateway.execute(&mut session, "begin").await.unwrap();

        assert_eq!(primary.open_transactions(), 1);
        let mut other = gateway.open_session();
        let rows = gateway
            .execute(&mut other, "select * from customer")
            .await
            .unwrap();
        assert_eq!(rows.rows.len(), 1);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_primary_available() {
        let (gateway, primary, _replica) = cluster().await;
        primary.set_serving(false);
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let mut session = gateway.open_session();
        let err = gateway
            .execute(&mut session, "select * from customer")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NoPrimaryAvailable);
        assert!(err.is_retryable());
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pinned_tablet_gone() {
        let (gateway, _primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "use @replica").await.unwrap();
        gateway.execute(&mut session, "begin").await.unwrap();

        let alias = TabletAlias::new("zone1", 101);
        gateway.remove_tablet(&alias).await.unwrap();

        let err = gateway
            .execute(&mut session, "select * from customer")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::PinnedTabletGone(alias.clone()));
        assert_eq!(
            gateway.execute(&mut session, "commit").await.unwrap_err(),
            GatewayError::PinnedTabletGone(alias)
        );
        assert!(session.in_transaction());

        gateway.execute(&mut session, "rollback").await.unwrap();
        assert!(!session.in_transaction());
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_commit_keeps_pin_until_rollback() {
        let (gateway, primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "begin").await.unwrap();
        gateway
            .execute(&mut session, "insert into customer(id, email) values(1,'a')")
            .await
            .unwrap();

        primary.set_reachable(false);
        let err = gateway.execute(&mut session, "commit").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Tablet(TabletError::Unreachable("zone1-0000000100".to_string()))
        );
        assert!(session.in_transaction());

        // begin while pinned commits first and fails the same way
        assert!(gateway.execute(&mut session, "begin").await.is_err());
        assert!(session.in_transaction());
        assert_eq!(primary.open_transactions(), 1);

        primary.set_reachable(true);
        gateway.execute(&mut session, "rollback").await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(primary.open_transactions(), 0);
        assert_eq!(gateway.metrics().snapshot().transactions_committed, 0);

        gateway.close_session(session).await;
        assert_eq!(primary.open_transactions(), 0);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_after_backend_dropped_transaction() {
        let (gateway, primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "begin").await.unwrap();
        let pin = session.pin().cloned().unwrap();

        primary.rollback(pin.transaction).await.unwrap();
        gateway.execute(&mut session, "rollback").await.unwrap();
        assert!(!session.in_transaction());
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_use_unknown_keyspace() {
        let (gateway, _primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        assert_eq!(
            gateway.execute(&mut session, "use customer@replica").await,
            Err(GatewayError::UnknownKeyspace("customer".to_string()))
        );
        gateway.execute(&mut session, "use commerce@replica").await.unwrap();
        assert_eq!(session.target().role, TabletType::Replica);
        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_session_rolls_back() {
        let (gateway, primary, _replica) = cluster().await;
        let mut session = gateway.open_session();
        gateway.execute(&mut session, "begin").await.unwrap();
        assert_eq!(primary.open_transactions(), 1);

        gateway.close_session(session).await;
        assert_eq!(primary.open_transactions(), 0);
        gateway.shutdown().await;
    }
}
