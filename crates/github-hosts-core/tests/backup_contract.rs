//! Contract Test: Backup Store
//!
//! Snapshots are the user's only undo for hosts edits.
//!
//! Constraints verified:
//! - A snapshot is a byte-for-byte copy
//! - Listing is newest first and ignores foreign files
//! - Restore snapshots the current file before overwriting it
//! - A vanished snapshot fails with `BackupNotFound` and touches nothing

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use github_hosts_core::config::Platform;
use github_hosts_core::{BackupStore, Error};

fn store(fixture: &Fixture) -> BackupStore {
    BackupStore::new(&fixture.settings.backup_dir)
}

#[tokio::test]
async fn snapshot_is_verbatim_copy() {
    let content = "127.0.0.1 localhost\r\n# odd   spacing\t\r\n\r\n";
    let fixture = Fixture::new(Platform::Windows, content);
    let store = store(&fixture);

    let record = store.snapshot(fixture.hosts_path()).await.unwrap();

    assert!(record.name.starts_with("hosts_"));
    assert_eq!(record.name.len(), "hosts_".len() + 14);
    assert_eq!(record.size_bytes, content.len() as u64);
    assert_eq!(std::fs::read(&record.path).unwrap(), content.as_bytes());
    assert_eq!(fixture.hosts(), content);
}

#[tokio::test]
async fn list_is_newest_first_and_skips_foreign_files() {
    let fixture = Fixture::new(Platform::Linux, "127.0.0.1 localhost\n");
    let store = store(&fixture);

    for hour in [8, 12, 10] {
        let at = Utc.with_ymd_and_hms(2025, 1, 9, hour, 0, 0).unwrap();
        store.snapshot_at(fixture.hosts_path(), at).await.unwrap();
    }
    std::fs::write(store.dir().join("notes.txt"), "mine").unwrap();
    std::fs::create_dir(store.dir().join("hosts_dir")).unwrap();

    let names: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect();

    assert_eq!(
        names,
        vec![
            "hosts_20250109120000",
            "hosts_20250109100000",
            "hosts_20250109080000",
        ]
    );
}

#[tokio::test]
async fn restore_takes_safety_snapshot_first() {
    let fixture = Fixture::new(Platform::Linux, "original\n");
    let store = store(&fixture);

    let past = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let old = store.snapshot_at(fixture.hosts_path(), past).await.unwrap();

    std::fs::write(fixture.hosts_path(), "edited\n").unwrap();

    let safety = store.restore(&old, fixture.hosts_path()).await.unwrap();

    assert_eq!(fixture.hosts(), "original\n");
    assert_ne!(safety.name, old.name);
    assert_eq!(std::fs::read_to_string(&safety.path).unwrap(), "edited\n");
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn restore_of_vanished_snapshot_leaves_hosts_untouched() {
    let fixture = Fixture::new(Platform::Linux, "original\n");
    let store = store(&fixture);

    let past = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let record = store.snapshot_at(fixture.hosts_path(), past).await.unwrap();
    std::fs::remove_file(&record.path).unwrap();
    std::fs::write(fixture.hosts_path(), "current\n").unwrap();

    let result = store.restore(&record, fixture.hosts_path()).await;

    assert!(matches!(result, Err(Error::BackupNotFound(name)) if name == record.name));
    assert_eq!(fixture.hosts(), "current\n");
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn find_and_delete_report_missing_names() {
    let fixture = Fixture::new(Platform::Linux, "original\n");
    let store = store(&fixture);

    assert!(matches!(
        store.find("hosts_20000101000000").await,
        Err(Error::BackupNotFound(_))
    ));

    let record = store.snapshot(fixture.hosts_path()).await.unwrap();
    assert_eq!(store.find(&record.name).await.unwrap(), record);

    store.delete(&record).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert!(matches!(
        store.delete(&record).await,
        Err(Error::BackupNotFound(_))
    ));
}
