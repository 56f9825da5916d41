//! Chunked deletion through the archive operation.

mod common;

use common::*;
use coldstore::{DeletionExecutor, DeletionPlan};
use std::time::Duration;

fn bucket_schema() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            TableSchema::new("Bucket", "buckets")
                .id()
                .has_many("items", "Item", "bucket_id", true),
        )
        .with(
            TableSchema::new("Item", "items")
                .id()
                .belongs_to("bucket_id", "Bucket"),
        )
}

#[test]
fn archive_deletes_25000_children_in_three_chunks() {
    init_tracing();
    let schema = bucket_schema();
    let store = MemoryStore::from_schema(&schema).unwrap();
    store.insert("buckets", attrs([("id", Value::Int(1))])).unwrap();
    for _ in 0..25_000 {
        store
            .insert("items", attrs([("bucket_id", Value::Int(1))]))
            .unwrap();
    }
    let config = config();

    let outcome = Archiver::new(&schema, &store, &config)
        .archive(
            &EntityRef::new("Bucket", 1i64),
            &ArchiveOptions::deleting(),
            &mut Transport::in_memory(),
        )
        .unwrap();

    assert_eq!(outcome.bundle.records("Item").len(), 25_000);
    let deletions = outcome.deletions.unwrap();
    assert_eq!(deletions.rows, 25_000);
    assert_eq!(deletions.batches, 3);

    let chunks = store.stats().delete_batches("items");
    assert_eq!(chunks, vec![10_000, 10_000, 5_000]);
    assert!(chunks.iter().all(|c| *c <= 10_000));
    assert_eq!(store.count("items").unwrap(), 0);
    assert_eq!(store.count("buckets").unwrap(), 1);
}

#[test]
fn configured_chunk_size_is_honored() {
    let schema = bucket_schema();
    let store = MemoryStore::from_schema(&schema).unwrap();
    store.insert("buckets", attrs([("id", Value::Int(1))])).unwrap();
    for _ in 0..7 {
        store
            .insert("items", attrs([("bucket_id", Value::Int(1))]))
            .unwrap();
    }
    let mut config = config();
    config.delete_batch_size = 3;

    Archiver::new(&schema, &store, &config)
        .archive(
            &EntityRef::new("Bucket", 1i64),
            &ArchiveOptions::deleting(),
            &mut Transport::in_memory(),
        )
        .unwrap();

    assert_eq!(store.stats().delete_batches("items"), vec![3, 3, 1]);
}

#[test]
fn empty_plan_issues_no_deletes() {
    let store = seeded_store();
    let executor = DeletionExecutor::new(&store, 10_000, Duration::ZERO);

    let summary = executor.execute(DeletionPlan::new(), &[]).unwrap();

    assert_eq!(summary.rows, 0);
    assert!(summary.tables.is_empty());
    assert!(store.stats().delete_batches("orders").is_empty());
}
