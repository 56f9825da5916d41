//! Shared fixtures for the integration suites.
//!
//! Import via `mod common;` from any test file.
//!
//! Schema: Account -< Order -< LineItem (cascade), Account -< Note (not
//! cascade). Accounts carry the archived flag and archive key columns.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Once;

pub use coldstore::{
    attrs, ArchiveOptions, ArchiveOutcome, Archiver, ArchiverConfig, Attributes, ColumnKind,
    EntityRef, EnumSpec, Error, Identity, MemoryStore, MemoryTransport, RecordStore,
    SchemaRegistry, TableSchema, Transport, UnarchiveOptions, UnarchiveReport, UnarchiveTarget,
    Unarchiver, Value,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (visible with --nocapture)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn schema() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            TableSchema::new("Account", "accounts")
                .id()
                .col("name", ColumnKind::Text)
                .col("archived", ColumnKind::Boolean)
                .col("archive_key", ColumnKind::Text)
                .has_many("orders", "Order", "account_id", true)
                .has_many("notes", "Note", "account_id", false),
        )
        .with(
            TableSchema::new("Order", "orders")
                .id()
                .belongs_to("account_id", "Account")
                .col("total", ColumnKind::Float)
                .col("placed_at", ColumnKind::Timestamp)
                .enum_col(
                    "status",
                    EnumSpec::integer([("pending", 0), ("shipped", 1), ("cancelled", 2)]),
                    Some(Value::Int(0)),
                )
                .has_many("line_items", "LineItem", "order_id", true),
        )
        .with(
            TableSchema::new("LineItem", "line_items")
                .id()
                .belongs_to("order_id", "Order")
                .col("sku", ColumnKind::Text)
                .col("quantity", ColumnKind::Integer)
                .unique(&["order_id", "sku"]),
        )
        .with(
            TableSchema::new("Note", "notes")
                .id()
                .belongs_to("account_id", "Account")
                .col("body", ColumnKind::Text),
        )
}

pub fn config() -> ArchiverConfig {
    ArchiverConfig::without_delays()
}

pub fn account_ref(id: i64) -> EntityRef {
    EntityRef::new("Account", id)
}

pub fn new_copy() -> UnarchiveOptions {
    UnarchiveOptions {
        new_copy: true,
        ..Default::default()
    }
}

/// Account 1 with orders 10 and 11, line item 100 under order 10, and one
/// (non-cascade) note
pub fn seeded_store() -> MemoryStore {
    init_tracing();
    let store = MemoryStore::from_schema(&schema()).unwrap();
    store
        .insert(
            "accounts",
            attrs([
                ("id", Value::Int(1)),
                ("name", Value::from("acme")),
                ("archived", Value::Bool(false)),
            ]),
        )
        .unwrap();
    for (id, total) in [(10, 20.0), (11, 35.5)] {
        store
            .insert(
                "orders",
                attrs([
                    ("id", Value::Int(id)),
                    ("account_id", Value::Int(1)),
                    ("total", Value::Float(total)),
                    ("status", Value::Int(1)),
                    ("placed_at", timestamp("2024-03-01T10:00:00Z")),
                ]),
            )
            .unwrap();
    }
    store
        .insert(
            "line_items",
            attrs([
                ("id", Value::Int(100)),
                ("order_id", Value::Int(10)),
                ("sku", Value::from("A-1")),
                ("quantity", Value::Int(2)),
            ]),
        )
        .unwrap();
    store
        .insert(
            "notes",
            attrs([
                ("id", Value::Int(1)),
                ("account_id", Value::Int(1)),
                ("body", Value::from("call back")),
            ]),
        )
        .unwrap();
    store
}

/// Timestamp value from an RFC 3339 string
pub fn timestamp(raw: &str) -> Value {
    Value::Timestamp(Value::from(raw).to_utc_timestamp().unwrap())
}

/// Archive `root` with the shared schema and config
pub fn archive(
    store: &MemoryStore,
    root: &EntityRef,
    options: ArchiveOptions,
    transport: &mut Transport,
) -> ArchiveOutcome {
    let schema = schema();
    let config = config();
    Archiver::new(&schema, store, &config)
        .archive(root, &options, transport)
        .unwrap()
}

/// Unarchive with the shared schema and config
pub fn unarchive(
    store: &MemoryStore,
    target: UnarchiveTarget,
    options: UnarchiveOptions,
    transport: &mut Transport,
) -> coldstore::Result<UnarchiveReport> {
    let schema = schema();
    let config = config();
    Unarchiver::new(&schema, store, &config).unarchive(&target, &options, transport)
}

/// Attribute maps of every row in `table`, ordered by primary key
pub fn rows(store: &MemoryStore, table: &str) -> Vec<Attributes> {
    store
        .rows(table)
        .unwrap()
        .into_iter()
        .map(|r| r.attributes)
        .collect()
}

/// Single row by integer id
pub fn row(store: &MemoryStore, table: &str, id: i64) -> Option<Attributes> {
    store
        .get(table, &Identity::Int(id))
        .unwrap()
        .map(|r| r.attributes)
}
