//! Object-storage transport against a directory bucket.

mod common;

use std::sync::Arc;

use common::*;
use coldstore::{BundleArchiveReader, LocalObjectStore, ObjectStore};
use tempfile::TempDir;

fn bucket() -> (TempDir, Arc<LocalObjectStore>) {
    let dir = TempDir::new().unwrap();
    let objects = Arc::new(LocalObjectStore::new(dir.path().join("bucket")).unwrap());
    (dir, objects)
}

#[test]
fn archive_uploads_and_records_the_key() {
    let store = seeded_store();
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects.clone(), "/archives/");

    let outcome = archive(&store, &account_ref(1), ArchiveOptions::deleting(), &mut transport);

    let key = &outcome.location;
    assert!(key.starts_with("archives/1_"));
    assert!(key.ends_with(".bundle.tar.zst"));
    let suffix = &key["archives/1_".len()..key.len() - ".bundle.tar.zst".len()];
    assert_eq!(suffix.len(), 16);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(objects.exists(key).unwrap());

    let account = row(&store, "accounts", 1).unwrap();
    assert_eq!(account.get("archive_key"), Some(&Value::String(key.clone())));
    assert_eq!(account.get("archived"), Some(&Value::Bool(true)));

    let contents = BundleArchiveReader::read(&objects.path_for(key).unwrap()).unwrap();
    assert_eq!(contents.bundle, outcome.bundle);
    assert_eq!(contents.manifest.owner, Some(account_ref(1)));
    assert_eq!(contents.manifest.contents.record_count, 4);
}

#[test]
fn unarchive_by_entity_reads_the_recorded_key() {
    let store = seeded_store();
    let orders_before = rows(&store, "orders");
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects, "archives");

    archive(&store, &account_ref(1), ArchiveOptions::deleting(), &mut transport);
    assert_eq!(store.count("orders").unwrap(), 0);

    let report = unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert!(report.is_clean());
    // Timestamps and floats survive the JSON trip
    assert_eq!(rows(&store, "orders"), orders_before);
    assert_eq!(
        row(&store, "accounts", 1).unwrap().get("archived"),
        Some(&Value::Bool(false))
    );
}

#[test]
fn unarchive_by_location_into_another_store() {
    let source = seeded_store();
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects, "archives");
    let outcome = archive(&source, &account_ref(1), ArchiveOptions::default(), &mut transport);

    let target = MemoryStore::from_schema(&schema()).unwrap();
    let report = unarchive(
        &target,
        UnarchiveTarget::Location(outcome.location),
        new_copy(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(report.total_imported(), 4);
    let new_order = report.new_identity("Order", &Identity::Int(10)).unwrap();
    let item = target.rows("line_items").unwrap().remove(0);
    assert_eq!(item.get("order_id"), Some(&new_order.to_value()));
}

#[test]
fn missing_object_is_a_fatal_transport_error() {
    let store = seeded_store();
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects, "archives");

    let err = unarchive(
        &store,
        UnarchiveTarget::Location("archives/1_0000000000000000.bundle.tar.zst".to_string()),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(store.count("orders").unwrap(), 2);
}

#[test]
fn entity_without_recorded_key_cannot_be_retrieved() {
    let store = seeded_store();
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects, "archives");

    let err = unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Transport(msg) if msg.contains("no archive key")));
}

#[test]
fn corrupted_object_is_rejected() {
    let store = seeded_store();
    let (_dir, objects) = bucket();
    let mut transport = config().object_storage_transport(objects.clone(), "archives");
    let outcome = archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);

    std::fs::write(objects.path_for(&outcome.location).unwrap(), b"not an archive").unwrap();

    let err = unarchive(
        &store,
        UnarchiveTarget::Location(outcome.location),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
