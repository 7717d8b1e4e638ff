//! In-memory MVCC tablet
//!
//! Backs the local cluster and the test suite. Each table stores one
//! [`VersionChain`] per primary key, kept in first-insert order. The primary
//! assigns a [`CommitId`] to every commit and ships the committed writes to
//! its attached replicas, which apply them strictly in commit order.
//!
//! A transaction captures a [`ReadView`] at begin. Every read inside it uses
//! that view, so commits applied later (locally or through replication) stay
//! invisible until the transaction ends.
//!
//! Replication can be paused on a replica to build up lag; the reported lag is
//! the age of the oldest commit received but not yet applied.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::backend::{ProbeResponse, TabletBackend, TransactionId};
use super::errors::{TabletError, TabletResult};
use super::sql::{self, Filter, Projection, Statement};
use crate::mvcc::{CommitId, ReadView, Version, VersionChain};
use crate::query::{Field, QueryResult, Row, Value};
use crate::topology::{TabletInfo, TabletType};

/// One committed or pending row change
#[derive(Debug, Clone, PartialEq)]
enum Write {
    Put { table: String, key: Value, row: Row },
    Delete { table: String, key: Value },
}

impl Write {
    fn table(&self) -> &str {
        match self {
            Write::Put { table, .. } | Write::Delete { table, .. } => table,
        }
    }

    fn key(&self) -> &Value {
        match self {
            Write::Put { key, .. } | Write::Delete { key, .. } => key,
        }
    }
}

/// Writes of one commit as shipped to replicas
#[derive(Debug, Clone)]
struct CommitBatch {
    commit_id: CommitId,
    committed_at: DateTime<Utc>,
    writes: Vec<Write>,
}

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    chains: Vec<VersionChain>,
    index: HashMap<Value, usize>,
}

impl Table {
    fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            chains: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn column_index(&self, name: &str) -> TabletResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TabletError::UnknownColumn(name.to_string()))
    }

    fn chain(&self, key: &Value) -> Option<&VersionChain> {
        self.index.get(key).map(|&i| &self.chains[i])
    }

    fn apply(&mut self, version: Version) {
        let key = version.key().clone();
        match self.index.get(&key) {
            Some(&i) => self.chains[i].push(version),
            None => {
                let mut chain = VersionChain::new(key.clone());
                chain.push(version);
                self.index.insert(key, self.chains.len());
                self.chains.push(chain);
            }
        }
    }

    /// Latest committed row for a key, ignoring read views
    fn latest_row(&self, key: &Value) -> Option<&Row> {
        self.chain(key).and_then(|c| c.latest()).and_then(|v| v.row())
    }

    /// Rows visible under `view`, in first-insert order
    fn visible_rows(&self, view: ReadView) -> Vec<(Value, Row)> {
        self.chains
            .iter()
            .filter_map(|chain| {
                chain
                    .visible_version(view)
                    .version()
                    .and_then(|v| v.row())
                    .map(|row| (chain.key().clone(), row.clone()))
            })
            .collect()
    }
}

#[derive(Debug)]
struct Transaction {
    view: ReadView,
    writes: Vec<Write>,
}

#[derive(Debug)]
struct TabletState {
    tablet_type: TabletType,
    primary_term_start: Option<DateTime<Utc>>,
    tables: HashMap<String, Table>,
    applied: CommitId,
    pending: VecDeque<CommitBatch>,
    replication_paused: bool,
    transactions: HashMap<TransactionId, Transaction>,
    next_transaction: u64,
}

impl TabletState {
    fn table(&self, name: &str) -> TabletResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| TabletError::UnknownTable(name.to_string()))
    }

    fn apply_batch(&mut self, batch: &CommitBatch) {
        for write in &batch.writes {
            let Some(table) = self.tables.get_mut(write.table()) else {
                continue;
            };
            let version = match write {
                Write::Put { key, row, .. } => {
                    Version::with_row(key.clone(), row.clone(), batch.commit_id)
                }
                Write::Delete { key, .. } => Version::with_tombstone(key.clone(), batch.commit_id),
            };
            table.apply(version);
        }
        self.applied = batch.commit_id;
    }

    fn apply_pending(&mut self) {
        while let Some(batch) = self.pending.pop_front() {
            if batch.commit_id <= self.applied {
                continue;
            }
            self.apply_batch(&batch);
        }
    }

    fn lag_seconds(&self, now: DateTime<Utc>) -> f64 {
        match self.pending.front() {
            Some(batch) => {
                let lag = now.signed_duration_since(batch.committed_at);
                (lag.num_milliseconds().max(0) as f64) / 1000.0
            }
            None => 0.0,
        }
    }
}

/// In-process tablet with snapshot-isolated transactions and replication.
pub struct MemoryTablet {
    info: TabletInfo,
    state: Mutex<TabletState>,
    replicas: Mutex<Vec<Arc<MemoryTablet>>>,
    reachable: AtomicBool,
    serving: AtomicBool,
    probe_delay_ms: AtomicU64,
}

impl MemoryTablet {
    /// Create a tablet serving in its configured role
    pub fn new(info: TabletInfo) -> Self {
        let tablet_type = info.tablet_type;
        let primary_term_start = tablet_type.is_primary().then(Utc::now);
        Self {
            info,
            state: Mutex::new(TabletState {
                tablet_type,
                primary_term_start,
                tables: HashMap::new(),
                applied: CommitId::ZERO,
                pending: VecDeque::new(),
                replication_paused: false,
                transactions: HashMap::new(),
                next_transaction: 1,
            }),
            replicas: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            serving: AtomicBool::new(true),
            probe_delay_ms: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TabletState> {
        // Versions above `applied` are never visible, so a poisoned lock
        // still guards a consistent snapshot.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn alias(&self) -> String {
        self.info.alias.to_string()
    }

    /// Define a table. The first column is the primary key.
    pub fn create_table(&self, name: &str, columns: &[&str]) -> TabletResult<()> {
        if columns.is_empty() {
            return Err(TabletError::Syntax(format!("table '{}' has no columns", name)));
        }
        let columns = columns.iter().map(|c| c.to_ascii_lowercase()).collect();
        self.lock()
            .tables
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Table::new(columns));
        Ok(())
    }

    /// Attach a replica that receives every commit made on this tablet
    pub fn attach_replica(&self, replica: Arc<MemoryTablet>) {
        if let Ok(mut replicas) = self.replicas.lock() {
            replicas.push(replica);
        }
    }

    /// Detach a replica by alias
    pub fn detach_replica(&self, replica: &TabletInfo) {
        if let Ok(mut replicas) = self.replicas.lock() {
            replicas.retain(|r| r.info.alias != replica.alias);
        }
    }

    /// Simulate a network partition: probes and statements fail
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Toggle query serving. Probes still answer, reporting not serving.
    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::SeqCst);
    }

    /// Delay every probe answer, e.g. to exceed the health-check timeout
    pub fn set_probe_delay(&self, delay: Duration) {
        self.probe_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Change the role this tablet serves in
    pub fn set_tablet_type(&self, tablet_type: TabletType) {
        let mut state = self.lock();
        if tablet_type.is_primary() && !state.tablet_type.is_primary() {
            state.primary_term_start = Some(Utc::now());
        } else if !tablet_type.is_primary() {
            state.primary_term_start = None;
        }
        state.tablet_type = tablet_type;
    }

    /// Stop applying replicated commits; they queue up as lag
    pub fn pause_replication(&self) {
        self.lock().replication_paused = true;
    }

    /// Apply everything queued and keep applying as commits arrive
    pub fn resume_replication(&self) {
        let mut state = self.lock();
        state.replication_paused = false;
        state.apply_pending();
    }

    /// Role the tablet currently serves in
    pub fn tablet_type(&self) -> TabletType {
        self.lock().tablet_type
    }

    pub fn is_primary(&self) -> bool {
        self.tablet_type().is_primary()
    }

    /// Highest commit applied on this tablet
    pub fn applied_commit(&self) -> CommitId {
        self.lock().applied
    }

    /// Number of open transactions
    pub fn open_transactions(&self) -> usize {
        self.lock().transactions.len()
    }

    fn receive(&self, batch: CommitBatch) {
        let mut state = self.lock();
        state.pending.push_back(batch);
        if !state.replication_paused {
            state.apply_pending();
        }
    }

    fn ship(&self, batch: CommitBatch) {
        let replicas = match self.replicas.lock() {
            Ok(replicas) => replicas.clone(),
            Err(_) => return,
        };
        for replica in replicas {
            replica.receive(batch.clone());
        }
    }

    fn check_reachable(&self) -> TabletResult<()> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(TabletError::Unreachable(self.alias()));
        }
        Ok(())
    }

    fn check_serving(&self) -> TabletResult<()> {
        self.check_reachable()?;
        if !self.serving.load(Ordering::SeqCst) {
            return Err(TabletError::NotServing(self.alias()));
        }
        Ok(())
    }

    /// Commit `writes` as one batch. Caller holds the state lock.
    fn commit_locked(&self, state: &mut TabletState, writes: Vec<Write>) -> Option<CommitBatch> {
        if writes.is_empty() {
            return None;
        }
        let batch = CommitBatch {
            commit_id: state.applied.next(),
            committed_at: Utc::now(),
            writes,
        };
        state.apply_batch(&batch);
        Some(batch)
    }

    fn run(
        &self,
        state: &TabletState,
        tx: Option<TransactionId>,
        statement: Statement,
    ) -> TabletResult<(QueryResult, Vec<Write>)> {
        let (view, own_writes): (ReadView, &[Write]) = match tx {
            Some(id) => {
                let t = state
                    .transactions
                    .get(&id)
                    .ok_or(TabletError::UnknownTransaction(id))?;
                (t.view, t.writes.as_slice())
            }
            None => (ReadView::new(state.applied), [].as_slice()),
        };

        if statement.is_write() && !state.tablet_type.accepts_writes() {
            return Err(TabletError::ReadOnly(self.alias()));
        }

        match statement {
            Statement::Select {
                table,
                projection,
                filter,
            } => {
                let t = state.table(&table)?;
                let result = select(t, view, own_writes, &table, &projection, filter.as_ref())?;
                Ok((result, Vec::new()))
            }
            Statement::Insert {
                table,
                columns,
                rows,
            } => {
                let t = state.table(&table)?;
                let mut writes = Vec::with_capacity(rows.len());
                for values in rows {
                    let row = build_row(t, &columns, values)?;
                    let key = row.get(0).cloned().unwrap_or(Value::Null);
                    let exists = current_row(t, own_writes, &writes, &table, &key).is_some();
                    if exists {
                        return Err(TabletError::DuplicateKey(key.to_string()));
                    }
                    writes.push(Write::Put {
                        table: table.clone(),
                        key,
                        row,
                    });
                }
                let affected = writes.len() as u64;
                Ok((QueryResult::affected(affected), writes))
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let t = state.table(&table)?;
                let targets = select_keys(t, own_writes, &table, &filter)?;
                let mut writes = Vec::with_capacity(targets.len());
                for (key, mut row) in targets {
                    for (column, value) in &assignments {
                        let i = t.column_index(column)?;
                        if i == 0 {
                            return Err(TabletError::Syntax(
                                "primary key cannot be updated".to_string(),
                            ));
                        }
                        row.0[i] = value.clone();
                    }
                    writes.push(Write::Put {
                        table: table.clone(),
                        key,
                        row,
                    });
                }
                let affected = writes.len() as u64;
                Ok((QueryResult::affected(affected), writes))
            }
            Statement::Delete { table, filter } => {
                let t = state.table(&table)?;
                let writes: Vec<Write> = select_keys(t, own_writes, &table, &filter)?
                    .into_iter()
                    .map(|(key, _)| Write::Delete {
                        table: table.clone(),
                        key,
                    })
                    .collect();
                let affected = writes.len() as u64;
                Ok((QueryResult::affected(affected), writes))
            }
        }
    }
}

fn build_row(table: &Table, columns: &[String], values: Vec<Value>) -> TabletResult<Row> {
    let mut row = vec![Value::Null; table.columns.len()];
    for (column, value) in columns.iter().zip(values) {
        row[table.column_index(column)?] = value;
    }
    if row[0].is_null() {
        return Err(TabletError::Syntax(format!(
            "primary key '{}' cannot be null",
            table.columns[0]
        )));
    }
    Ok(Row::new(row))
}

/// Newest row for `key` taking uncommitted writes into account
fn current_row<'a>(
    table: &'a Table,
    own_writes: &'a [Write],
    batch: &'a [Write],
    table_name: &str,
    key: &Value,
) -> Option<&'a Row> {
    let overlay = own_writes
        .iter()
        .chain(batch.iter())
        .filter(|w| w.table() == table_name && w.key() == key)
        .last();
    match overlay {
        Some(Write::Put { row, .. }) => Some(row),
        Some(Write::Delete { .. }) => None,
        None => table.latest_row(key),
    }
}

/// Rows matching `filter`, against the latest committed state plus own writes
fn select_keys(
    table: &Table,
    own_writes: &[Write],
    table_name: &str,
    filter: &Filter,
) -> TabletResult<Vec<(Value, Row)>> {
    let column = table.column_index(&filter.column)?;
    let mut keys: Vec<Value> = table.chains.iter().map(|c| c.key().clone()).collect();
    for write in own_writes.iter().filter(|w| w.table() == table_name) {
        if !keys.contains(write.key()) {
            keys.push(write.key().clone());
        }
    }
    Ok(keys
        .into_iter()
        .filter_map(|key| {
            current_row(table, own_writes, &[], table_name, &key)
                .filter(|row| row.get(column) == Some(&filter.value))
                .map(|row| (key.clone(), row.clone()))
        })
        .collect())
}

fn select(
    table: &Table,
    view: ReadView,
    own_writes: &[Write],
    table_name: &str,
    projection: &Projection,
    filter: Option<&Filter>,
) -> TabletResult<QueryResult> {
    let mut rows = table.visible_rows(view);
    for write in own_writes.iter().filter(|w| w.table() == table_name) {
        let position = rows.iter().position(|(k, _)| k == write.key());
        match (write, position) {
            (Write::Put { row, .. }, Some(i)) => rows[i].1 = row.clone(),
            (Write::Put { key, row, .. }, None) => rows.push((key.clone(), row.clone())),
            (Write::Delete { .. }, Some(i)) => {
                rows.remove(i);
            }
            (Write::Delete { .. }, None) => {}
        }
    }

    if let Some(filter) = filter {
        let column = table.column_index(&filter.column)?;
        rows.retain(|(_, row)| row.get(column) == Some(&filter.value));
    }

    let indexes: Vec<usize> = match projection {
        Projection::All => (0..table.columns.len()).collect(),
        Projection::Columns(columns) => columns
            .iter()
            .map(|c| table.column_index(c))
            .collect::<TabletResult<_>>()?,
    };

    let projected: Vec<Row> = rows
        .into_iter()
        .map(|(_, row)| {
            Row::new(
                indexes
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .collect();

    let fields = indexes
        .iter()
        .enumerate()
        .map(|(position, &i)| {
            let type_name = projected
                .iter()
                .filter_map(|r| r.get(position))
                .find(|v| !v.is_null())
                .map(|v| v.type_name())
                .unwrap_or("NULL_TYPE");
            Field::new(table.columns[i].clone(), type_name)
        })
        .collect();

    Ok(QueryResult::with_rows(fields, projected))
}

#[async_trait]
impl TabletBackend for MemoryTablet {
    fn info(&self) -> &TabletInfo {
        &self.info
    }

    async fn probe(&self) -> TabletResult<ProbeResponse> {
        let delay = self.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_reachable()?;

        let state = self.lock();
        Ok(ProbeResponse {
            tablet_type: state.tablet_type,
            serving: self.serving.load(Ordering::SeqCst),
            replication_lag_seconds: state.lag_seconds(Utc::now()),
            primary_term_start: state.primary_term_start,
        })
    }

    async fn begin(&self) -> TabletResult<TransactionId> {
        self.check_serving()?;
        let mut state = self.lock();
        let id = TransactionId::new(state.next_transaction);
        state.next_transaction += 1;
        let view = ReadView::new(state.applied);
        state.transactions.insert(
            id,
            Transaction {
                view,
                writes: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn execute(&self, tx: Option<TransactionId>, sql: &str) -> TabletResult<QueryResult> {
        self.check_serving()?;
        let statement = sql::parse(sql)?;

        let mut state = self.lock();
        let (result, writes) = self.run(&state, tx, statement)?;
        let batch = match tx {
            Some(id) => {
                if let Some(t) = state.transactions.get_mut(&id) {
                    t.writes.extend(writes);
                }
                None
            }
            None => self.commit_locked(&mut state, writes),
        };
        drop(state);

        if let Some(batch) = batch {
            self.ship(batch);
        }
        Ok(result)
    }

    async fn commit(&self, tx: TransactionId) -> TabletResult<()> {
        self.check_reachable()?;
        let batch = {
            let mut state = self.lock();
            let transaction = state
                .transactions
                .remove(&tx)
                .ok_or(TabletError::UnknownTransaction(tx))?;
            if !transaction.writes.is_empty() && !state.tablet_type.accepts_writes() {
                return Err(TabletError::ReadOnly(self.alias()));
            }
            self.commit_locked(&mut state, transaction.writes)
        };
        if let Some(batch) = batch {
            self.ship(batch);
        }
        Ok(())
    }

    async fn rollback(&self, tx: TransactionId) -> TabletResult<()> {
        self.lock()
            .transactions
            .remove(&tx)
            .map(|_| ())
            .ok_or(TabletError::UnknownTransaction(tx))
    }
}
