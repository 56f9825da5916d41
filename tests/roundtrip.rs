//! Archive → (delete) → restore-in-place reproduces the original rows.

mod common;

use common::*;

fn snapshot(store: &MemoryStore) -> Vec<Vec<Attributes>> {
    ["accounts", "orders", "line_items", "notes"]
        .iter()
        .map(|t| rows(store, t))
        .collect()
}

#[test]
fn restore_without_delete_is_identity() {
    let store = seeded_store();
    let before = snapshot(&store);
    let mut transport = Transport::in_memory();

    archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);
    let report = unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert!(report.is_clean());
    assert!(report.warnings.is_empty());
    assert_eq!(snapshot(&store), before);
}

#[test]
fn archive_delete_restore_reproduces_identities() {
    let store = seeded_store();
    let before = snapshot(&store);
    let mut transport = Transport::in_memory();

    let outcome = archive(&store, &account_ref(1), ArchiveOptions::deleting(), &mut transport);

    let deletions = outcome.deletions.unwrap();
    assert_eq!(deletions.tables, vec!["line_items", "orders"]);
    assert_eq!(deletions.rows, 3);
    assert_eq!(store.count("orders").unwrap(), 0);
    assert_eq!(store.count("line_items").unwrap(), 0);
    // The root and non-cascade rows survive
    assert_eq!(
        row(&store, "accounts", 1).unwrap().get("archived"),
        Some(&Value::Bool(true))
    );
    assert_eq!(store.count("notes").unwrap(), 1);

    let report = unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(report.total_imported(), 4);
    assert!(report.mappings.is_empty());
    assert_eq!(snapshot(&store), before);
}

#[test]
fn restore_overwrites_rows_changed_since_archive() {
    let store = seeded_store();
    let mut transport = Transport::in_memory();
    archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);

    store
        .update_column("orders", &Identity::Int(10), "total", Value::Float(0.0))
        .unwrap();
    store
        .update_column("accounts", &Identity::Int(1), "name", Value::from("renamed"))
        .unwrap();

    unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(
        row(&store, "orders", 10).unwrap().get("total"),
        Some(&Value::Float(20.0))
    );
    assert_eq!(
        row(&store, "accounts", 1).unwrap().get("name"),
        Some(&Value::from("acme"))
    );
}

#[test]
fn restore_keeps_live_columns_absent_from_the_bundle() {
    let store = seeded_store();
    let mut transport = Transport::in_memory();
    archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);

    // Written after the snapshot; the bundle has no value for it
    store
        .update_column("accounts", &Identity::Int(1), "archive_key", Value::from("manual"))
        .unwrap();

    unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    let account = row(&store, "accounts", 1).unwrap();
    assert_eq!(account.get("archive_key"), Some(&Value::from("manual")));
    assert_eq!(account.get("archived"), Some(&Value::Bool(false)));
}

#[test]
fn restore_into_an_empty_store_forces_archived_identities() {
    let source = seeded_store();
    let mut transport = Transport::in_memory();
    archive(&source, &account_ref(1), ArchiveOptions::default(), &mut transport);

    let target = MemoryStore::from_schema(&schema()).unwrap();
    let report = unarchive(
        &target,
        UnarchiveTarget::Location("memory://bundle".to_string()),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(report.total_imported(), 4);
    assert_eq!(rows(&target, "orders"), rows(&source, "orders"));
    assert_eq!(rows(&target, "line_items"), rows(&source, "line_items"));
    assert!(row(&target, "accounts", 1).is_some());
    assert_eq!(target.count("notes").unwrap(), 0);
}
