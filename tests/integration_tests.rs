//! End-to-end tests: cache round trips, resolution passes, deletion
//! ownership and the SQLite bulk path, driven through the public
//! DataManager surface.

use std::rc::Rc;

use serde_json::json;

use orderstore::entities::Department;
use orderstore::{DataManager, DataMap, DataObject, Settings};

fn data_map(value: serde_json::Value) -> DataMap {
    match value {
        serde_json::Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

fn order_map(nr: i32) -> DataMap {
    data_map(json!({
        "uuid": format!("order-{nr}"),
        "nr": nr,
        "expressOrder": false,
        "title": format!("Order {nr}"),
        "orderDate": "2015-10-02",
        "state": 1,
        "customerId": 7,
        "depId": 42,
        "topicId": 3,
        "positions": [
            {
                "uuid": format!("item-{nr}-1"),
                "posNr": 1,
                "name": "pallet",
                "quantity": 2.0,
                "subItems": [
                    {
                        "uuid": format!("sub-{nr}-1"),
                        "subPosNr": 1,
                        "description": "strap",
                        "barcode": "4006381333931"
                    }
                ]
            }
        ],
        "info": {"uuid": format!("info-{nr}"), "remarks": "ring twice"},
        "tags": ["tag-a", "tag-b"],
        "domains": ["north"]
    }))
}

fn seeded_manager(dir: &tempfile::TempDir) -> DataManager {
    let mut dm = DataManager::new(Settings::new(dir.path()));

    let customer = dm.create_customer();
    customer.borrow_mut().id = 7;
    customer.borrow_mut().company_name = "Muster AG".into();
    dm.insert_customer(customer);

    let topic = dm.create_topic();
    topic.borrow_mut().id = 3;
    dm.insert_topic(topic);

    let department = dm.create_department();
    department.borrow_mut().id = 42;
    department.borrow_mut().name = "Sales".into();
    dm.insert_department(department);

    for uuid in ["tag-a", "tag-b"] {
        let tag = dm.create_tag();
        tag.borrow_mut().uuid = uuid.into();
        tag.borrow_mut().name = uuid.into();
        dm.insert_tag(tag);
    }

    let xtras = dm.create_xtras();
    xtras.borrow_mut().id = 12;
    dm.insert_xtras(xtras);

    dm.insert_order_from_map(&order_map(4711), false);
    dm
}

#[test]
fn cache_round_trip_preserves_non_transient_fields() {
    let dir = tempfile::tempdir().unwrap();
    {
        let dm = seeded_manager(&dir);
        let order = dm.find_order_by_nr(4711).unwrap();
        order.borrow_mut().processing_state = 9;
        dm.finish().unwrap();
    }

    let mut reloaded = DataManager::new(Settings::new(dir.path()));
    reloaded.init();
    assert_eq!(reloaded.order_count(), 1);
    let order = reloaded.find_order_by_nr(4711).unwrap();
    let order = order.borrow();
    assert_eq!(order.uuid, "order-4711");
    assert_eq!(order.title, "Order 4711");
    assert_eq!(order.customer_id(), 7);
    assert_eq!(order.dep_id(), 42);
    assert_eq!(order.topic_id(), 3);
    assert_eq!(order.positions_count(), 1);
    assert!(order.has_info());
    assert_eq!(order.tags_keys(), vec!["tag-a", "tag-b"]);
    // transient, must not survive the cache
    assert_eq!(order.processing_state, 0);
    // references are lazy: nothing resolved at load time
    assert!(!order.is_all_resolved());

    // customers went through their own cache file
    assert_eq!(reloaded.customer_count(), 1);
    assert_eq!(
        reloaded.find_customer_by_id(7).unwrap().borrow().company_name,
        "Muster AG"
    );
}

#[test]
fn resolution_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let dm = seeded_manager(&dir);
    let order = dm.find_order_by_nr(4711).unwrap();

    dm.resolve_order_references(&order);
    assert!(order.borrow().is_all_resolved());
    assert!(order.borrow().is_customer_id_resolved());
    assert!(order.borrow().is_dep_id_resolved());
    assert!(order.borrow().is_topic_id_resolved());
    assert_eq!(order.borrow().tags_count(), 2);

    // a second pass performs zero mutations
    dm.resolve_order_references(&order);
    assert!(order.borrow().is_all_resolved());
    assert_eq!(order.borrow().tags_count(), 2);

    let customer = order.borrow().customer().unwrap();
    assert_eq!(customer.borrow().id, 7);
}

#[test]
fn unresolvable_reference_goes_invalid_until_rekeyed() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = seeded_manager(&dir);
    // no department 99 exists
    let mut m = order_map(4712);
    m.insert("depId".into(), json!(99));
    dm.insert_order_from_map(&m, false);

    let order = dm.find_order_by_nr(4712).unwrap();
    dm.resolve_order_references(&order);
    assert!(!order.borrow().is_dep_id_resolved());
    assert!(!order.borrow().has_dep_id());
    // invalid no longer demands resolution
    assert!(order.borrow().is_all_resolved());

    // re-keying clears the invalid flag and re-arms resolution
    order.borrow_mut().set_dep_id(42);
    assert!(order.borrow().has_dep_id());
    assert!(!order.borrow().is_dep_id_resolved());
    dm.resolve_order_references(&order);
    assert!(order.borrow().is_dep_id_resolved());
}

#[test]
fn tag_list_resolves_partially_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = seeded_manager(&dir);
    let mut m = order_map(4713);
    m.insert("tags".into(), json!(["tag-a", "missing", "tag-b"]));
    dm.insert_order_from_map(&m, false);

    let order = dm.find_order_by_nr(4713).unwrap();
    dm.resolve_order_references(&order);
    // two of three keys matched; the flag is set regardless
    assert!(order.borrow().are_tags_keys_resolved());
    assert_eq!(order.borrow().tags_count(), 2);
}

#[test]
fn duplicate_domain_keys_resolve_to_first_inserted() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = seeded_manager(&dir);
    // a second customer with the same domain key
    let duplicate = dm.create_customer();
    duplicate.borrow_mut().id = 7;
    duplicate.borrow_mut().company_name = "Impostor GmbH".into();
    dm.insert_customer(duplicate);

    // linear scan, first match wins: the first-inserted customer
    let found = dm.find_customer_by_id(7).unwrap();
    assert_eq!(found.borrow().company_name, "Muster AG");
}

#[test]
fn deleting_an_order_releases_children_but_not_tags() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = seeded_manager(&dir);
    let order = dm.find_order_by_nr(4711).unwrap();
    dm.resolve_order_references(&order);

    let item = order.borrow().positions().get(0).unwrap().clone();
    let sub = item.borrow().sub_items().get(0).unwrap().clone();
    let item_probe = Rc::downgrade(&item);
    let sub_probe = Rc::downgrade(&sub);
    drop(item);
    drop(sub);

    assert!(dm.delete_order(&order));
    drop(order);
    // owned children are gone
    assert!(item_probe.upgrade().is_none());
    assert!(sub_probe.upgrade().is_none());
    // referenced tags are independent and stay findable
    assert!(dm.find_tag_by_uuid("tag-a").is_some());
    assert!(dm.find_tag_by_uuid("tag-b").is_some());
    assert_eq!(dm.tag_count(), 2);
}

#[test]
fn seed_from_asset_then_empty_without_either() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(
        assets.path().join("cacheXtras.json"),
        r#"[{"id": 1, "name": "seeded"}]"#,
    )
    .unwrap();

    let data = tempfile::tempdir().unwrap();
    let mut dm = DataManager::new(
        Settings::new(data.path()).with_assets_dir(assets.path()),
    );
    dm.init();
    // asset was copied into the writable cache location and loaded
    assert_eq!(dm.xtras_count(), 1);
    assert!(data.path().join("cacheXtras.json").exists());
    // collections with neither cache nor asset come up empty, not failed
    assert_eq!(dm.order_count(), 0);
    assert_eq!(dm.customer_count(), 0);
}

#[test]
fn foreign_map_reads_status_writes_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = DataManager::new(Settings::new(dir.path()));
    let m = data_map(json!({
        "nr": 9000,
        "title": "wire order",
        "STATUS": "CONFIRMED"
    }));
    dm.insert_order_from_map(&m, true);

    let order = dm.find_order_by_nr(9000).unwrap();
    let out = order.borrow().to_foreign_map();
    assert_eq!(out.get("state"), Some(&json!(1)));
    assert!(!out.contains_key("STATUS"));

    // the domestic shape never reads STATUS
    let mut dm2 = DataManager::new(Settings::new(dir.path()));
    dm2.insert_order_from_map(&m, false);
    let order2 = dm2.find_order_by_nr(9000).unwrap();
    assert_eq!(order2.borrow().to_map().get("state"), Some(&json!(-1)));
}

#[test]
fn finish_skips_read_only_collections() {
    let dir = tempfile::tempdir().unwrap();
    let dm = seeded_manager(&dir);
    dm.finish().unwrap();
    assert!(dir.path().join("cacheOrder.json").exists());
    assert!(dir.path().join("cacheCustomer.json").exists());
    assert!(dir.path().join("cacheTopic.json").exists());
    assert!(dir.path().join("cacheXtras.json").exists());
    // read-only reference collections are not re-persisted
    assert!(!dir.path().join("cacheDepartment.json").exists());
    assert!(!dir.path().join("cacheTag.json").exists());

    // the explicit save paths still work for cache refresh flows
    dm.save_departments_to_cache().unwrap();
    dm.save_tags_to_cache().unwrap();
    assert!(dir.path().join("cacheDepartment.json").exists());
    assert!(dir.path().join("cacheTag.json").exists());
}

#[test]
fn department_tree_round_trip_and_flat_lookup() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut dm = DataManager::new(Settings::new(dir.path()));
        let root = dm.create_department();
        root.borrow_mut().id = 1;
        root.borrow_mut().name = "Sales".into();
        let child = Department::create_child(&root);
        child.borrow_mut().id = 10;
        child.borrow_mut().name = "Sales EMEA".into();
        Department::add_child(&root, child);
        dm.insert_department(root);
        dm.save_departments_to_cache().unwrap();
    }

    let mut dm = DataManager::new(Settings::new(dir.path()));
    dm.init();
    assert_eq!(dm.department_count(), 1);
    assert_eq!(dm.departments_flat().len(), 2);
    // a nested child is found through the flattened view
    let child = dm.find_department_by_id(10).unwrap();
    assert_eq!(child.borrow().name, "Sales EMEA");
    // and knows its containing parent
    let parent = child.borrow().parent_dep().unwrap();
    assert_eq!(parent.borrow().id, 1);
}

#[test]
fn sqlite_bulk_cache_round_trip_through_store() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut dm = DataManager::new(Settings::new(dir.path()).with_chunk_size(16));
        dm.init();
        for i in 0..50 {
            let tag = dm.create_tag();
            tag.borrow_mut().name = format!("tag {i}");
            tag.borrow_mut().value = i;
            dm.insert_tag(tag);
        }
        dm.save_tags_to_sql_cache().unwrap();
    }

    let mut dm = DataManager::new(Settings::new(dir.path()));
    dm.init();
    assert_eq!(dm.tag_count(), 50);
    // the json tag path stays available as the alternative repository,
    // even though init wires only the sql path
    dm.save_tags_to_cache().unwrap();
    let loaded = dm.load_tags_from_cache().unwrap();
    assert_eq!(loaded, 50);
}

#[test]
fn failed_bulk_import_leaves_previous_rows_suspect_but_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = DataManager::new(Settings::new(dir.path()).with_chunk_size(2));
    dm.init();
    for uuid in ["a", "b", "c", "a"] {
        let tag = dm.create_tag();
        tag.borrow_mut().uuid = uuid.into();
        dm.insert_tag(tag);
    }
    // the duplicate primary key aborts the import mid-stream
    assert!(dm.save_tags_to_sql_cache().is_err());

    // wholesale re-import with clean data recovers the table
    assert!(dm.delete_tag_by_uuid("a"));
    dm.save_tags_to_sql_cache().unwrap();
    let count = dm.load_tags_from_sql_cache().unwrap();
    assert_eq!(count, 3);
}

#[test]
fn reinit_replaces_collections_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    {
        let dm = seeded_manager(&dir);
        dm.finish().unwrap();
    }
    let mut dm = DataManager::new(Settings::new(dir.path()));
    dm.init();
    assert_eq!(dm.order_count(), 1);
    dm.init();
    assert_eq!(dm.order_count(), 1);
    assert_eq!(dm.customer_count(), 1);
}

#[test]
fn created_entities_stay_out_of_collections_until_inserted() {
    let dir = tempfile::tempdir().unwrap();
    let dm = DataManager::new(Settings::new(dir.path()));
    let order = dm.create_order();
    assert_eq!(order.borrow().uuid().len(), 36);
    assert_eq!(dm.order_count(), 0);
    assert!(dm.find_order_by_nr(order.borrow().nr).is_none());
    dm.undo_create_order(order);
    assert_eq!(dm.order_count(), 0);
}

#[test]
fn order_validity_contract() {
    let dir = tempfile::tempdir().unwrap();
    let mut dm = seeded_manager(&dir);
    let order = dm.find_order_by_nr(4711).unwrap();
    assert!(order.borrow().is_valid());

    // tags/topic/extras are optional for validity
    let mut minimal = order_map(5000);
    minimal.remove("tags");
    minimal.remove("topicId");
    minimal.remove("info");
    dm.insert_order_from_map(&minimal, false);
    assert!(dm.find_order_by_nr(5000).unwrap().borrow().is_valid());

    // a missing order date is not
    let mut undated = order_map(5001);
    undated.remove("orderDate");
    dm.insert_order_from_map(&undated, false);
    assert!(!dm.find_order_by_nr(5001).unwrap().borrow().is_valid());
}

#[test]
fn resolved_reference_adopts_live_entity_and_survives_rekey() {
    let dir = tempfile::tempdir().unwrap();
    let dm = seeded_manager(&dir);
    let order = dm.find_order_by_nr(4711).unwrap();
    dm.resolve_order_references(&order);

    let department = order.borrow().department().unwrap();
    assert_eq!(department.borrow().id, 42);

    // manual resolve with a different entity overwrites the stored key
    let topic = dm.create_topic();
    topic.borrow_mut().id = 77;
    order.borrow_mut().resolve_topic_id(&topic);
    assert_eq!(order.borrow().topic_id(), 77);
    assert!(order.borrow().is_topic_id_resolved());
}
