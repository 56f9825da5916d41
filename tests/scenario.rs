//! Account/Order/LineItem end to end: bundle shape, import order, new-copy
//! identities.

mod common;

use common::*;

#[test]
fn archive_bundles_cascade_children_only() {
    let store = seeded_store();
    let mut transport = Transport::in_memory();

    let outcome = archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);
    let bundle = outcome.bundle;

    assert_eq!(bundle.type_names(), vec!["Account", "LineItem", "Order"]);
    assert_eq!(bundle.records("Account").len(), 1);
    assert_eq!(bundle.records("Order").len(), 2);
    assert_eq!(bundle.records("LineItem").len(), 1);
    assert!(bundle.records("Note").is_empty());

    let item = &bundle.records("LineItem")[0];
    assert_eq!(item.get("id"), Some(&Value::Int(100)));
    assert_eq!(item.get("order_id"), Some(&Value::Int(10)));
    for order in bundle.records("Order") {
        assert_eq!(order.get("account_id"), Some(&Value::Int(1)));
    }
}

#[test]
fn bundle_serializes_as_flat_type_map() {
    let store = seeded_store();
    let outcome = archive(&store, &account_ref(1), ArchiveOptions::default(), &mut Transport::in_memory());

    let json = serde_json::to_string(&outcome.bundle).unwrap();
    assert!(json.starts_with("{\"Account\":[{\"archived\":false,\"id\":1,\"name\":\"acme\"}]"));
    assert!(json.contains("\"LineItem\":[{\"id\":100,\"order_id\":10,\"quantity\":2,\"sku\":\"A-1\"}]"));

    // Archive file round trip carries the same bundle
    let bytes = coldstore::BundleArchiveWriter::with_defaults()
        .write_to_vec(&outcome.bundle, Some(&account_ref(1)))
        .unwrap();
    let contents = coldstore::BundleArchiveReader::read_from_bytes(&bytes).unwrap();
    assert_eq!(contents.bundle, outcome.bundle);
    assert_eq!(contents.manifest.owner, Some(account_ref(1)));
}

#[test]
fn unarchive_orders_account_then_order_then_line_item() {
    let store = seeded_store();
    let mut transport = Transport::in_memory();
    archive(&store, &account_ref(1), ArchiveOptions::deleting(), &mut transport);

    let report = unarchive(
        &store,
        UnarchiveTarget::Entity(account_ref(1)),
        UnarchiveOptions::default(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(report.order, vec!["Account", "Order", "LineItem"]);
    assert!(report.is_clean());
}

#[test]
fn new_copy_assigns_fresh_identities_and_remaps_foreign_keys() {
    let store = seeded_store();
    // Unrelated rows push the next identities to 501 / 601 / 701
    store
        .insert("accounts", attrs([("id", Value::Int(500)), ("name", Value::from("other"))]))
        .unwrap();
    store
        .insert("orders", attrs([("id", Value::Int(600)), ("account_id", Value::Int(500))]))
        .unwrap();
    store
        .insert(
            "line_items",
            attrs([
                ("id", Value::Int(700)),
                ("order_id", Value::Int(600)),
                ("sku", Value::from("Z-9")),
            ]),
        )
        .unwrap();

    let mut transport = Transport::in_memory();
    archive(&store, &account_ref(1), ArchiveOptions::default(), &mut transport);
    let report = unarchive(
        &store,
        UnarchiveTarget::Location("memory://bundle".to_string()),
        new_copy(),
        &mut transport,
    )
    .unwrap();

    assert_eq!(report.new_identity("Account", &Identity::Int(1)), Some(&Identity::Int(501)));
    assert_eq!(report.new_identity("Order", &Identity::Int(10)), Some(&Identity::Int(601)));
    assert_eq!(report.new_identity("Order", &Identity::Int(11)), Some(&Identity::Int(602)));
    assert_eq!(report.new_identity("LineItem", &Identity::Int(100)), Some(&Identity::Int(701)));

    let item = row(&store, "line_items", 701).unwrap();
    assert_eq!(item.get("order_id"), Some(&Value::Int(601)));
    for id in [601, 602] {
        let order = row(&store, "orders", id).unwrap();
        assert_eq!(order.get("account_id"), Some(&Value::Int(501)));
    }

    // The originals are untouched
    let original = row(&store, "line_items", 100).unwrap();
    assert_eq!(original.get("order_id"), Some(&Value::Int(10)));
    assert_eq!(store.count("orders").unwrap(), 5);
}
