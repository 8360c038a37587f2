//! Snapshot assembly and backup catalogue tests

use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::FutureExt;

use routergate::access::Role;
use routergate::errors::GatewayError;
use routergate::executor::CommandExecutor;
use routergate::filesys::dir::Dir;
use routergate::session::SessionFactory;
use routergate::snapshot::{BackupStore, DeviceIdentity, Snapshot, SnapshotAssembler};

use crate::support::{endpoint, gateway_with_device, principal, Failure, MockDevice};

async fn assemble_at(
    device: &std::sync::Arc<MockDevice>,
    created_at: chrono::DateTime<Utc>,
) -> Result<Snapshot, GatewayError> {
    let factory = SessionFactory::new(device.connector(), Duration::from_secs(1));
    let assembler = SnapshotAssembler::new(CommandExecutor::new(Duration::from_secs(1)));
    let endpoint = endpoint();
    let identity = DeviceIdentity::of(&endpoint);
    factory
        .with_session(&endpoint, move |session| {
            async move { assembler.assemble(session, identity, created_at).await }.boxed()
        })
        .await
}

fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_all_reads_share_one_session_in_order() {
    let device = MockDevice::new();
    let snapshot = assemble_at(&device, Utc::now()).await.unwrap();

    assert_eq!(device.opened(), 1);
    assert_eq!(device.closed(), 1);
    assert_eq!(
        device.sent_paths(),
        vec![
            "/system/resource/print",
            "/ip/address/print",
            "/ip/firewall/filter/print",
            "/ip/firewall/nat/print",
            "/queue/simple/print",
            "/interface/vlan/print",
            "/interface/bridge/print",
            "/export",
        ]
    );

    assert_eq!(snapshot.resource_summary["board-name"], "RB5009");
    assert_eq!(snapshot.address_list.len(), 2);
    assert_eq!(snapshot.raw_export_lines[0], "/interface bridge");
    assert_eq!(snapshot.raw_export_lines.len(), 4);
    assert_eq!(snapshot.raw_export_sha256.len(), 64);
    assert_eq!(snapshot.device_identity.host, "192.168.88.1");
}

#[tokio::test]
async fn test_sixth_read_failure_writes_nothing() {
    let device = MockDevice::failing_on(6, Failure::Device("failure: interrupted".into()));
    let (dir, gateway, id) = gateway_with_device(&device, true).await;

    let err = gateway
        .take_backup(&principal(Role::Admin), &id)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::DeviceError(_)));
    assert_eq!(device.sent_paths().len(), 6);
    assert_eq!(device.closed(), 1);
    assert_eq!(file_count(&dir.path().join("backups")), 0);
}

#[tokio::test]
async fn test_backup_writes_both_artifacts() {
    let device = MockDevice::new();
    let (dir, gateway, id) = gateway_with_device(&device, true).await;

    let files = gateway.take_backup(&principal(Role::Owner), &id).await.unwrap();
    assert!(files.snapshot.starts_with("/backups/192.168.88.1_"));
    assert!(files.snapshot.ends_with(".json"));
    assert!(files.export.ends_with(".rsc.txt"));

    let backups = dir.path().join("backups");
    assert_eq!(file_count(&backups), 2);

    let export_name = files.export.trim_start_matches("/backups/");
    let export = std::fs::read_to_string(backups.join(export_name)).unwrap();
    assert!(export.starts_with("/interface bridge\nadd name=bridge1"));

    let json_name = files.snapshot.trim_start_matches("/backups/");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(backups.join(json_name)).unwrap()).unwrap();
    assert_eq!(json["deviceIdentity"]["host"], "192.168.88.1");
    assert_eq!(json["deviceIdentity"]["user"], "admin");
    assert!(json["createdAt"].is_string());
    assert!(json["natRules"].is_array());
    assert!(json.get("pass").is_none());
}

#[tokio::test]
async fn test_read_role_cannot_take_backups() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;

    let err = gateway.take_backup(&principal(Role::Read), &id).await.unwrap_err();
    assert!(matches!(err, GatewayError::InsufficientRole { .. }));
    assert_eq!(device.opened(), 0);
}

#[tokio::test]
async fn test_snapshots_one_second_apart_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(Dir::new(dir.path()));
    let device = MockDevice::new();

    let first = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let second = first + chrono::Duration::seconds(1);

    let a = store.persist(&assemble_at(&device, first).await.unwrap()).await.unwrap();
    let b = store.persist(&assemble_at(&device, second).await.unwrap()).await.unwrap();

    assert_ne!(a.snapshot, b.snapshot);
    assert_ne!(a.export, b.export);
    assert_eq!(file_count(dir.path()), 4);
}

#[tokio::test]
async fn test_existing_artifact_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(Dir::new(dir.path()));
    let device = MockDevice::new();
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

    let snapshot = assemble_at(&device, at).await.unwrap();
    store.persist(&snapshot).await.unwrap();
    assert!(store.persist(&snapshot).await.is_err());
    assert_eq!(file_count(dir.path()), 2);
}

#[tokio::test]
async fn test_list_is_newest_first_and_read_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(Dir::new(dir.path()));
    let device = MockDevice::new();

    let older = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
    let newer = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    store.persist(&assemble_at(&device, older).await.unwrap()).await.unwrap();
    store.persist(&assemble_at(&device, newer).await.unwrap()).await.unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let entries = store.list().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries[0].name.contains("2025-01-01T00-00-00-000Z"));
    assert!(entries[1].name.contains("2025-01-01T00-00-00-000Z"));
    assert!(entries[3].name.contains("2024-12-31T23-59-59-000Z"));
    assert!(entries.iter().all(|e| e.url == format!("/backups/{}", e.name)));
    assert!(entries.iter().any(|e| e.kind == "snapshot"));
    assert!(entries.iter().any(|e| e.kind == "export"));

    let bytes = store.read(&entries[0].name).await.unwrap();
    assert!(!bytes.is_empty());

    for name in ["../users.json", "..", "a/b.json", "a\\b.json", "notes.txt"] {
        assert!(
            matches!(store.read(name).await, Err(GatewayError::ValidationError(_))),
            "{name}"
        );
    }
    assert!(matches!(
        store.read("missing_2020.json").await,
        Err(GatewayError::NotFound(_))
    ));
}
