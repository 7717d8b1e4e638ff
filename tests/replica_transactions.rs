//! Replica Transaction Consistency Tests
//!
//! A transaction begun on a replica keeps reading the snapshot taken at
//! begin, even after later primary commits have replicated to that replica.
//! The new rows become visible once the transaction ends.

use std::time::Duration;

use tabletgate::gateway::{Gateway, GatewayError, GatewayOptions};
use tabletgate::session::Session;
use tabletgate::tablet::LocalCluster;
use tabletgate::topology::{TabletAlias, TabletInfo, TabletType};

const SELECT: &str = "select id, email from customer";
const ONE_ROW: &str = r#"[[INT64(1) VARCHAR("email1")]]"#;
const TWO_ROWS: &str = r#"[[INT64(1) VARCHAR("email1")] [INT64(2) VARCHAR("email2")]]"#;

// =============================================================================
// Helper Functions
// =============================================================================

fn info(uid: u32, tablet_type: TabletType) -> TabletInfo {
    TabletInfo::new(
        TabletAlias::new("zone1", uid),
        "commerce",
        "0",
        "localhost",
        15000 + uid as u16,
        tablet_type,
    )
}

async fn start() -> (Gateway, LocalCluster) {
    let cluster = LocalCluster::new(vec![
        info(100, TabletType::Primary),
        info(101, TabletType::Replica),
        info(102, TabletType::Replica),
    ]);
    cluster.create_table("customer", &["id", "email"]).unwrap();

    let gateway = Gateway::new(GatewayOptions::default());
    for tablet in cluster.tablets() {
        gateway.add_tablet(tablet.clone()).unwrap();
    }
    gateway.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    (gateway, cluster)
}

async fn run(gateway: &Gateway, session: &mut Session, sql: &str) -> String {
    gateway.execute(session, sql).await.unwrap().rows_string()
}

// =============================================================================
// Snapshot consistency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_replica_transaction_reads_begin_snapshot() {
    let (gateway, _cluster) = start().await;
    let mut writer = gateway.open_session();
    let mut reader = gateway.open_session();

    run(&gateway, &mut writer, "insert into customer(id, email) values(1,'email1')").await;

    run(&gateway, &mut reader, "use @replica").await;
    run(&gateway, &mut reader, "begin").await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, ONE_ROW);

    run(&gateway, &mut writer, "begin").await;
    run(&gateway, &mut writer, "insert into customer(id, email) values(2,'email2')").await;
    run(&gateway, &mut writer, "commit").await;

    // Replication is synchronous here, so the commit is already applied on
    // every replica; the open transaction must still not see it.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, ONE_ROW);
    assert_eq!(run(&gateway, &mut reader, SELECT).await, ONE_ROW);

    run(&gateway, &mut reader, "commit").await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, TWO_ROWS);
    gateway.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_autocommit_replica_reads_see_latest() {
    let (gateway, _cluster) = start().await;
    let mut writer = gateway.open_session();
    let mut pinned = gateway.open_session();
    let mut autocommit = gateway.open_session();

    run(&gateway, &mut writer, "insert into customer(id, email) values(1,'email1')").await;
    run(&gateway, &mut pinned, "use @replica").await;
    run(&gateway, &mut autocommit, "use @replica").await;

    run(&gateway, &mut pinned, "begin").await;
    run(&gateway, &mut pinned, SELECT).await;
    run(&gateway, &mut writer, "insert into customer(id, email) values(2,'email2')").await;

    assert_eq!(run(&gateway, &mut autocommit, SELECT).await, TWO_ROWS);
    assert_eq!(run(&gateway, &mut pinned, SELECT).await, ONE_ROW);
    gateway.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rollback_also_ends_snapshot() {
    let (gateway, _cluster) = start().await;
    let mut writer = gateway.open_session();
    let mut reader = gateway.open_session();

    run(&gateway, &mut writer, "insert into customer(id, email) values(1,'email1')").await;
    run(&gateway, &mut reader, "use commerce@replica").await;
    run(&gateway, &mut reader, "start transaction").await;
    run(&gateway, &mut reader, SELECT).await;
    run(&gateway, &mut writer, "insert into customer(id, email) values(2,'email2')").await;

    run(&gateway, &mut reader, "rollback").await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, TWO_ROWS);
    assert_eq!(gateway.metrics().snapshot().transactions_rolled_back, 1);
    gateway.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_lagging_replica_snapshot_catches_up_after_commit() {
    let (gateway, cluster) = start().await;
    for replica in cluster.replicas() {
        replica.pause_replication();
    }
    let mut writer = gateway.open_session();
    let mut reader = gateway.open_session();

    run(&gateway, &mut writer, "insert into customer(id, email) values(1,'email1')").await;
    run(&gateway, &mut reader, "use @replica").await;
    run(&gateway, &mut reader, "begin").await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, "[]");

    for replica in cluster.replicas() {
        replica.resume_replication();
    }
    assert_eq!(run(&gateway, &mut reader, SELECT).await, "[]");

    run(&gateway, &mut reader, "commit").await;
    assert_eq!(run(&gateway, &mut reader, SELECT).await, ONE_ROW);
    gateway.shutdown().await;
}

// =============================================================================
// Pinning
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_transaction_stays_on_pinned_tablet() {
    let (gateway, cluster) = start().await;
    let mut reader = gateway.open_session();
    run(&gateway, &mut reader, "use @replica").await;
    run(&gateway, &mut reader, "begin").await;

    let pinned = reader.pin().unwrap().alias.clone();
    let pinned_tablet = cluster.get(&pinned).unwrap();
    assert_eq!(pinned_tablet.open_transactions(), 1);

    for _ in 0..3 {
        run(&gateway, &mut reader, SELECT).await;
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    assert_eq!(reader.pin().unwrap().alias, pinned);

    run(&gateway, &mut reader, "commit").await;
    assert_eq!(pinned_tablet.open_transactions(), 0);
    gateway.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_writes_in_replica_transaction_rejected() {
    let (gateway, cluster) = start().await;
    let mut reader = gateway.open_session();
    run(&gateway, &mut reader, "use @replica").await;
    run(&gateway, &mut reader, "begin").await;

    let err = gateway
        .execute(&mut reader, "insert into customer(id, email) values(9,'x')")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ReadOnlyTarget(_)));
    assert!(reader.in_transaction());

    run(&gateway, &mut reader, "rollback").await;
    let primary = cluster.primary().unwrap();
    assert_eq!(primary.applied_commit().value(), 0);
    gateway.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_switching_target_mid_transaction_keeps_pin() {
    let (gateway, _cluster) = start().await;
    let mut session = gateway.open_session();
    run(&gateway, &mut session, "use @replica").await;
    run(&gateway, &mut session, "begin").await;
    run(&gateway, &mut session, "use @primary").await;

    let err = gateway
        .execute(&mut session, "delete from customer where id = 1")
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::ReadOnlyTarget("@replica".to_string()));

    run(&gateway, &mut session, "commit").await;
    gateway
        .execute(&mut session, "delete from customer where id = 1")
        .await
        .unwrap();
    gateway.shutdown().await;
}
