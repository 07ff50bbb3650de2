//! Collection store: in-memory registry of all root entities
//!
//! The [`DataManager`] owns one insertion-ordered collection per root
//! entity type, loads them from the on-device cache on [`DataManager::init`],
//! resolves lazy cross-references on demand and persists the mutable
//! collections back on [`DataManager::finish`]. All lookups are linear
//! first-match scans; misses are logged and reported as `None`/`false`,
//! never as errors.

pub mod cache;
pub mod events;
pub mod sql;

use std::rc::Rc;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::core::config::Settings;
use crate::core::entity::{DataObject, EntityKind};
use crate::core::error::StoreError;
use crate::core::map::DataMap;
use crate::core::relation::{handle, Handle};
use crate::entities::customer::Customer;
use crate::entities::department::Department;
use crate::entities::order::Order;
use crate::entities::tag::Tag;
use crate::entities::topic::Topic;
use crate::entities::xtras::Xtras;
use events::{EventHub, StoreEvent, SubscriptionId};

const CACHE_ORDER: &str = "cacheOrder.json";
const CACHE_CUSTOMER: &str = "cacheCustomer.json";
const CACHE_TOPIC: &str = "cacheTopic.json";
// cacheDepartment holds a tree of departments; a flat view is derived in
// memory for filtering and key lookups
const CACHE_DEPARTMENT: &str = "cacheDepartment.json";
const CACHE_TAG: &str = "cacheTag.json";
const CACHE_XTRAS: &str = "cacheXtras.json";

pub struct DataManager {
    settings: Settings,
    db: Option<Connection>,
    orders: Vec<Handle<Order>>,
    customers: Vec<Handle<Customer>>,
    topics: Vec<Handle<Topic>>,
    departments: Vec<Handle<Department>>,
    tags: Vec<Handle<Tag>>,
    xtras: Vec<Handle<Xtras>>,
    hub: EventHub,
}

// Shared lookup helpers: linear scan, first match wins.

fn find_by<T>(items: &[Handle<T>], pred: impl Fn(&T) -> bool) -> Option<Handle<T>> {
    items.iter().find(|rc| pred(&rc.borrow())).cloned()
}

/// Batch lookup used to resolve lazy arrays: duplicates in the key list
/// are dropped, matches come back in collection order, unmatched keys are
/// logged and simply missing from the result.
fn list_for_keys<T>(
    label: &str,
    items: &[Handle<T>],
    keys: &[String],
    key_of: impl Fn(&T) -> String,
) -> Vec<Handle<T>> {
    let mut pending: Vec<String> = Vec::new();
    for key in keys {
        if !pending.contains(key) {
            pending.push(key.clone());
        }
    }
    let mut found = Vec::new();
    if pending.is_empty() {
        return found;
    }
    for rc in items {
        let key = key_of(&rc.borrow());
        if let Some(pos) = pending.iter().position(|p| *p == key) {
            pending.remove(pos);
            found.push(rc.clone());
            if pending.is_empty() {
                break;
            }
        }
    }
    if !pending.is_empty() {
        warn!("not all keys found for {label}: {}", pending.join(", "));
    }
    found
}

impl DataManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            db: None,
            orders: Vec::new(),
            customers: Vec::new(),
            topics: Vec::new(),
            departments: Vec::new(),
            tags: Vec::new(),
            xtras: Vec::new(),
            hub: EventHub::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Rows per bulk-import transaction chunk.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.settings.chunk_size = chunk_size;
    }

    // ---------------------------------------------------------------------
    // lifecycle
    // ---------------------------------------------------------------------

    /// Load all collections from the on-device cache.
    ///
    /// Fail-soft: a collection whose cache cannot be read comes up empty;
    /// references inside loaded orders stay unresolved until a resolution
    /// pass runs.
    pub fn init(&mut self) {
        match sql::open_database(&self.settings) {
            Ok(conn) => self.db = Some(conn),
            Err(e) => {
                warn!("cannot open {}: {e}", self.settings.db_file);
                self.db = None;
            }
        }
        if let Err(e) = self.load_orders_from_cache() {
            warn!("cannot load order cache: {e}");
        }
        if let Err(e) = self.load_customers_from_cache() {
            warn!("cannot load customer cache: {e}");
        }
        if let Err(e) = self.load_topics_from_cache() {
            warn!("cannot load topic cache: {e}");
        }
        if let Err(e) = self.load_departments_from_cache() {
            warn!("cannot load department cache: {e}");
        }
        // tag is the bulk collection: the SQLite path is the wired one,
        // the JSON path below stays available for cache refresh flows
        if let Err(e) = self.load_tags_from_sql_cache() {
            warn!("cannot load tag sql cache: {e}");
            self.tags.clear();
        }
        if let Err(e) = self.load_xtras_from_cache() {
            warn!("cannot load xtras cache: {e}");
        }
    }

    /// Persist the mutable collections. Department and tag are read-only
    /// reference data and are not saved automatically.
    pub fn finish(&self) -> Result<(), StoreError> {
        self.save_orders_to_cache()?;
        self.save_customers_to_cache()?;
        self.save_topics_to_cache()?;
        self.save_xtras_to_cache()?;
        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        self.hub.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    // ---------------------------------------------------------------------
    // reference resolution
    // ---------------------------------------------------------------------

    /// Resolve the lazy references of one order against the collections.
    /// Misses mark the reference invalid instead of failing; tag keys
    /// resolve all-or-nothing with partial results accepted.
    pub fn resolve_order_references(&self, order: &Handle<Order>) {
        if order.borrow().is_all_resolved() {
            debug!("nothing to do: all is resolved");
            return;
        }
        {
            let (has, resolved, key) = {
                let o = order.borrow();
                (o.has_topic_id(), o.is_topic_id_resolved(), o.topic_id())
            };
            if has && !resolved {
                match self.find_topic_by_id(key) {
                    Some(topic) => order.borrow_mut().resolve_topic_id(&topic),
                    None => {
                        debug!("mark topic id invalid: {key}");
                        order.borrow_mut().mark_topic_id_invalid();
                    }
                }
            }
        }
        {
            let (has, resolved, key) = {
                let o = order.borrow();
                (o.has_extras(), o.is_extras_resolved(), o.extras())
            };
            if has && !resolved {
                match self.find_xtras_by_id(key) {
                    Some(xtras) => order.borrow_mut().resolve_extras(&xtras),
                    None => {
                        debug!("mark extras invalid: {key}");
                        order.borrow_mut().mark_extras_invalid();
                    }
                }
            }
        }
        {
            let (has, resolved, key) = {
                let o = order.borrow();
                (o.has_customer_id(), o.is_customer_id_resolved(), o.customer_id())
            };
            if has && !resolved {
                match self.find_customer_by_id(key) {
                    Some(customer) => order.borrow_mut().resolve_customer_id(&customer),
                    None => {
                        debug!("mark customer id invalid: {key}");
                        order.borrow_mut().mark_customer_id_invalid();
                    }
                }
            }
        }
        {
            let (has, resolved, key) = {
                let o = order.borrow();
                (o.has_dep_id(), o.is_dep_id_resolved(), o.dep_id())
            };
            if has && !resolved {
                match self.find_department_by_id(key) {
                    Some(department) => order.borrow_mut().resolve_dep_id(&department),
                    None => {
                        debug!("mark dep id invalid: {key}");
                        order.borrow_mut().mark_dep_id_invalid();
                    }
                }
            }
        }
        if !order.borrow().are_tags_keys_resolved() {
            let keys = order.borrow().tags_keys();
            let tags = self.list_tags_for_keys(&keys);
            order.borrow_mut().resolve_tags_keys(tags);
        }
    }

    pub fn resolve_references_for_all_orders(&self) {
        for order in &self.orders {
            self.resolve_order_references(order);
        }
    }

    // ---------------------------------------------------------------------
    // O R D E R
    // ---------------------------------------------------------------------

    pub fn load_orders_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading orders from cache");
        self.orders.clear();
        let maps = cache::read_collection(&self.settings, CACHE_ORDER)?;
        debug!("read orders from cache: {}", maps.len());
        for m in &maps {
            let mut order = Order::default();
            order.fill_from_cache_map(m);
            let order = handle(order);
            Order::attach(&order);
            self.orders.push(order);
        }
        debug!("created orders: {}", self.orders.len());
        Ok(self.orders.len())
    }

    pub fn save_orders_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching orders: {}", self.orders.len());
        let maps: Vec<DataMap> = self.orders.iter().map(|o| o.borrow().to_cache_map()).collect();
        cache::write_collection(&self.settings, CACHE_ORDER, maps)
    }

    pub fn all_orders(&self) -> &[Handle<Order>] {
        &self.orders
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// nr is the domain key.
    pub fn find_order_by_nr(&self, nr: i32) -> Option<Handle<Order>> {
        let found = find_by(&self.orders, |o| o.nr == nr);
        if found.is_none() {
            debug!("no order found for nr {nr}");
        }
        found
    }

    pub fn list_orders_for_keys(&self, keys: &[String]) -> Vec<Handle<Order>> {
        list_for_keys("Order", &self.orders, keys, |o| o.nr.to_string())
    }

    /// Create a store-fresh order that is NOT yet in the collection.
    /// Either [`DataManager::insert_order`] it or discard it with
    /// [`DataManager::undo_create_order`].
    pub fn create_order(&self) -> Handle<Order> {
        let mut order = Order::default();
        order.prepare_new();
        handle(order)
    }

    /// Discard an order created with [`DataManager::create_order`] whose
    /// edit was canceled. For an already inserted order use
    /// [`DataManager::delete_order`].
    pub fn undo_create_order(&self, order: Handle<Order>) {
        debug!("undo create order {}", order.borrow().nr);
        drop(order);
    }

    pub fn insert_order(&mut self, order: Handle<Order>) {
        Order::attach(&order);
        let uuid = order.borrow().uuid.clone();
        self.orders.push(order);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Order,
            uuid,
        });
    }

    pub fn insert_order_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut order = Order::default();
        if use_foreign_properties {
            order.fill_from_foreign_map(map);
        } else {
            order.fill_from_map(map);
        }
        self.insert_order(handle(order));
    }

    pub fn delete_order(&mut self, order: &Handle<Order>) -> bool {
        let pos = match self.orders.iter().position(|rc| Rc::ptr_eq(rc, order)) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.orders.remove(pos);
        self.emit_order_deleted(&removed);
        true
    }

    pub fn delete_order_by_nr(&mut self, nr: i32) -> bool {
        let pos = match self.orders.iter().position(|rc| rc.borrow().nr == nr) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.orders.remove(pos);
        self.emit_order_deleted(&removed);
        true
    }

    pub fn delete_all_orders(&mut self) {
        for order in std::mem::take(&mut self.orders) {
            self.emit_order_deleted(&order);
        }
    }

    fn emit_order_deleted(&self, order: &Handle<Order>) {
        let (nr, uuid) = {
            let o = order.borrow();
            (o.nr, o.uuid.clone())
        };
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Order,
            key: nr.to_string(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Order,
            uuid,
        });
    }

    // ---------------------------------------------------------------------
    // C U S T O M E R
    // ---------------------------------------------------------------------

    pub fn load_customers_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading customers from cache");
        self.customers.clear();
        let maps = cache::read_collection(&self.settings, CACHE_CUSTOMER)?;
        for m in &maps {
            let mut customer = Customer::new();
            customer.fill_from_cache_map(m);
            self.customers.push(handle(customer));
        }
        debug!("created customers: {}", self.customers.len());
        Ok(self.customers.len())
    }

    pub fn save_customers_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching customers: {}", self.customers.len());
        let maps: Vec<DataMap> = self
            .customers
            .iter()
            .map(|c| c.borrow().to_cache_map())
            .collect();
        cache::write_collection(&self.settings, CACHE_CUSTOMER, maps)
    }

    pub fn all_customers(&self) -> &[Handle<Customer>] {
        &self.customers
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// id is the domain key.
    pub fn find_customer_by_id(&self, id: i32) -> Option<Handle<Customer>> {
        let found = find_by(&self.customers, |c| c.id == id);
        if found.is_none() {
            debug!("no customer found for id {id}");
        }
        found
    }

    pub fn customers_by_company_name(&self, company_name: &str) -> Vec<Handle<Customer>> {
        self.customers
            .iter()
            .filter(|c| c.borrow().company_name == company_name)
            .cloned()
            .collect()
    }

    pub fn list_customers_for_keys(&self, keys: &[String]) -> Vec<Handle<Customer>> {
        list_for_keys("Customer", &self.customers, keys, |c| c.id.to_string())
    }

    pub fn create_customer(&self) -> Handle<Customer> {
        let mut customer = Customer::new();
        customer.prepare_new();
        handle(customer)
    }

    pub fn undo_create_customer(&self, customer: Handle<Customer>) {
        debug!("undo create customer {}", customer.borrow().id);
        drop(customer);
    }

    pub fn insert_customer(&mut self, customer: Handle<Customer>) {
        let uuid = customer.borrow().uuid.clone();
        self.customers.push(customer);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Customer,
            uuid,
        });
    }

    pub fn insert_customer_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut customer = Customer::new();
        if use_foreign_properties {
            customer.fill_from_foreign_map(map);
        } else {
            customer.fill_from_map(map);
        }
        self.insert_customer(handle(customer));
    }

    pub fn delete_customer(&mut self, customer: &Handle<Customer>) -> bool {
        let pos = match self.customers.iter().position(|rc| Rc::ptr_eq(rc, customer)) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.customers.remove(pos);
        self.emit_customer_deleted(&removed);
        true
    }

    pub fn delete_customer_by_id(&mut self, id: i32) -> bool {
        let pos = match self.customers.iter().position(|rc| rc.borrow().id == id) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.customers.remove(pos);
        self.emit_customer_deleted(&removed);
        true
    }

    pub fn delete_all_customers(&mut self) {
        for customer in std::mem::take(&mut self.customers) {
            self.emit_customer_deleted(&customer);
        }
    }

    fn emit_customer_deleted(&self, customer: &Handle<Customer>) {
        let (id, uuid) = {
            let c = customer.borrow();
            (c.id, c.uuid.clone())
        };
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Customer,
            key: id.to_string(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Customer,
            uuid,
        });
    }

    // ---------------------------------------------------------------------
    // T O P I C
    // ---------------------------------------------------------------------

    pub fn load_topics_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading topics from cache");
        self.topics.clear();
        let maps = cache::read_collection(&self.settings, CACHE_TOPIC)?;
        for m in &maps {
            let mut topic = Topic::default();
            topic.fill_from_cache_map(m);
            self.topics.push(handle(topic));
        }
        debug!("created topics: {}", self.topics.len());
        Ok(self.topics.len())
    }

    pub fn save_topics_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching topics: {}", self.topics.len());
        let maps: Vec<DataMap> = self.topics.iter().map(|t| t.borrow().to_cache_map()).collect();
        cache::write_collection(&self.settings, CACHE_TOPIC, maps)
    }

    pub fn all_topics(&self) -> &[Handle<Topic>] {
        &self.topics
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn find_topic_by_uuid(&self, uuid: &str) -> Option<Handle<Topic>> {
        if uuid.is_empty() {
            debug!("cannot find topic from empty uuid");
            return None;
        }
        let found = find_by(&self.topics, |t| t.uuid == uuid);
        if found.is_none() {
            debug!("no topic found for uuid {uuid}");
        }
        found
    }

    /// id is the domain key.
    pub fn find_topic_by_id(&self, id: i32) -> Option<Handle<Topic>> {
        let found = find_by(&self.topics, |t| t.id == id);
        if found.is_none() {
            debug!("no topic found for id {id}");
        }
        found
    }

    pub fn list_topics_for_keys(&self, keys: &[String]) -> Vec<Handle<Topic>> {
        list_for_keys("Topic", &self.topics, keys, |t| t.id.to_string())
    }

    pub fn create_topic(&self) -> Handle<Topic> {
        let mut topic = Topic::default();
        topic.prepare_new();
        handle(topic)
    }

    pub fn undo_create_topic(&self, topic: Handle<Topic>) {
        debug!("undo create topic {}", topic.borrow().id);
        drop(topic);
    }

    pub fn insert_topic(&mut self, topic: Handle<Topic>) {
        let uuid = topic.borrow().uuid.clone();
        self.topics.push(topic);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Topic,
            uuid,
        });
    }

    pub fn insert_topic_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut topic = Topic::default();
        if use_foreign_properties {
            topic.fill_from_foreign_map(map);
        } else {
            topic.fill_from_map(map);
        }
        self.insert_topic(handle(topic));
    }

    pub fn delete_topic(&mut self, topic: &Handle<Topic>) -> bool {
        let pos = match self.topics.iter().position(|rc| Rc::ptr_eq(rc, topic)) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.topics.remove(pos);
        self.emit_topic_deleted(&removed);
        true
    }

    pub fn delete_topic_by_uuid(&mut self, uuid: &str) -> bool {
        if uuid.is_empty() {
            debug!("cannot delete topic from empty uuid");
            return false;
        }
        let pos = match self.topics.iter().position(|rc| rc.borrow().uuid == uuid) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.topics.remove(pos);
        self.emit_topic_deleted(&removed);
        true
    }

    pub fn delete_topic_by_id(&mut self, id: i32) -> bool {
        let pos = match self.topics.iter().position(|rc| rc.borrow().id == id) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.topics.remove(pos);
        self.emit_topic_deleted(&removed);
        true
    }

    pub fn delete_all_topics(&mut self) {
        for topic in std::mem::take(&mut self.topics) {
            self.emit_topic_deleted(&topic);
        }
    }

    fn emit_topic_deleted(&self, topic: &Handle<Topic>) {
        let uuid = topic.borrow().uuid.clone();
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Topic,
            key: uuid.clone(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Topic,
            uuid,
        });
    }

    // ---------------------------------------------------------------------
    // D E P A R T M E N T  (read-only tree)
    // ---------------------------------------------------------------------

    pub fn load_departments_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading departments from cache");
        self.departments.clear();
        let maps = cache::read_collection(&self.settings, CACHE_DEPARTMENT)?;
        for m in &maps {
            let mut department = Department::default();
            department.fill_from_cache_map(m);
            let department = handle(department);
            Department::attach(&department);
            self.departments.push(department);
        }
        debug!(
            "created department tree: {} roots, {} flat",
            self.departments.len(),
            self.departments_flat().len()
        );
        Ok(self.departments.len())
    }

    /// Departments are a read-only cache; not saved automatically on
    /// [`DataManager::finish`].
    pub fn save_departments_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching departments: {}", self.departments.len());
        let maps: Vec<DataMap> = self
            .departments
            .iter()
            .map(|d| d.borrow().to_cache_map())
            .collect();
        cache::write_collection(&self.settings, CACHE_DEPARTMENT, maps)
    }

    /// Tree roots.
    pub fn departments(&self) -> &[Handle<Department>] {
        &self.departments
    }

    /// Flat pre-order view of the whole tree, recomputed on demand so it
    /// can never go stale against tree-internal mutations.
    pub fn departments_flat(&self) -> Vec<Handle<Department>> {
        let mut flat = Vec::new();
        for root in &self.departments {
            flat.push(root.clone());
            flat.extend(root.borrow().all_department_children());
        }
        flat
    }

    pub fn department_count(&self) -> usize {
        self.departments.len()
    }

    pub fn find_department_by_uuid(&self, uuid: &str) -> Option<Handle<Department>> {
        if uuid.is_empty() {
            debug!("cannot find department from empty uuid");
            return None;
        }
        let flat = self.departments_flat();
        let found = find_by(&flat, |d| d.uuid == uuid);
        if found.is_none() {
            debug!("no department found for uuid {uuid}");
        }
        found
    }

    /// id is the domain key; the search covers the whole tree.
    pub fn find_department_by_id(&self, id: i32) -> Option<Handle<Department>> {
        let flat = self.departments_flat();
        let found = find_by(&flat, |d| d.id == id);
        if found.is_none() {
            debug!("no department found for id {id}");
        }
        found
    }

    /// Batch lookup over the tree roots only (matching the lazy-array
    /// resolution contract of the other collections).
    pub fn list_departments_for_keys(&self, keys: &[String]) -> Vec<Handle<Department>> {
        list_for_keys("Department", &self.departments, keys, |d| d.id.to_string())
    }

    pub fn create_department(&self) -> Handle<Department> {
        let mut department = Department::default();
        department.prepare_new();
        handle(department)
    }

    pub fn undo_create_department(&self, department: Handle<Department>) {
        debug!("undo create department {}", department.borrow().id);
        drop(department);
    }

    pub fn insert_department(&mut self, department: Handle<Department>) {
        Department::attach(&department);
        let uuid = department.borrow().uuid.clone();
        self.departments.push(department);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Department,
            uuid,
        });
    }

    pub fn insert_department_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut department = Department::default();
        if use_foreign_properties {
            department.fill_from_foreign_map(map);
        } else {
            department.fill_from_map(map);
        }
        self.insert_department(handle(department));
    }

    /// Delete a tree root (and with it the whole owned subtree).
    pub fn delete_department(&mut self, department: &Handle<Department>) -> bool {
        let pos = match self
            .departments
            .iter()
            .position(|rc| Rc::ptr_eq(rc, department))
        {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.departments.remove(pos);
        self.emit_department_deleted(&removed);
        true
    }

    pub fn delete_department_by_uuid(&mut self, uuid: &str) -> bool {
        if uuid.is_empty() {
            debug!("cannot delete department from empty uuid");
            return false;
        }
        let pos = match self.departments.iter().position(|rc| rc.borrow().uuid == uuid) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.departments.remove(pos);
        self.emit_department_deleted(&removed);
        true
    }

    pub fn delete_department_by_id(&mut self, id: i32) -> bool {
        let pos = match self.departments.iter().position(|rc| rc.borrow().id == id) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.departments.remove(pos);
        self.emit_department_deleted(&removed);
        true
    }

    pub fn delete_all_departments(&mut self) {
        for department in std::mem::take(&mut self.departments) {
            self.emit_department_deleted(&department);
        }
    }

    fn emit_department_deleted(&self, department: &Handle<Department>) {
        let uuid = department.borrow().uuid.clone();
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Department,
            key: uuid.clone(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Department,
            uuid,
        });
    }

    // ---------------------------------------------------------------------
    // T A G  (read-only bulk collection, SQLite-backed)
    // ---------------------------------------------------------------------

    /// The wired load path: stream the SQLite tag table.
    pub fn load_tags_from_sql_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading tags from sql cache");
        self.tags.clear();
        let conn = self.db.as_ref().ok_or(StoreError::DatabaseUnavailable)?;
        for tag in sql::load_tags(conn)? {
            self.tags.push(handle(tag));
        }
        debug!("read from sqlite and created tags: {}", self.tags.len());
        Ok(self.tags.len())
    }

    /// The JSON repository path for tags. Not wired in [`DataManager::init`]
    /// (the SQL path is), kept as the interchangeable alternative backend.
    pub fn load_tags_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading tags from json cache");
        self.tags.clear();
        let maps = cache::read_collection(&self.settings, CACHE_TAG)?;
        for m in &maps {
            let mut tag = Tag::default();
            tag.fill_from_cache_map(m);
            self.tags.push(handle(tag));
        }
        debug!("created tags: {}", self.tags.len());
        Ok(self.tags.len())
    }

    /// Tags are a read-only cache; not saved automatically on
    /// [`DataManager::finish`].
    pub fn save_tags_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching tags: {}", self.tags.len());
        let maps: Vec<DataMap> = self.tags.iter().map(|t| t.borrow().to_cache_map()).collect();
        cache::write_collection(&self.settings, CACHE_TAG, maps)
    }

    /// Chunked SQLite bulk import of the live tag collection.
    pub fn save_tags_to_sql_cache(&self) -> Result<(), StoreError> {
        let conn = self.db.as_ref().ok_or(StoreError::DatabaseUnavailable)?;
        sql::bulk_save_tags(conn, &self.tags, self.settings.chunk_size)
    }

    pub fn all_tags(&self) -> &[Handle<Tag>] {
        &self.tags
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn find_tag_by_uuid(&self, uuid: &str) -> Option<Handle<Tag>> {
        if uuid.is_empty() {
            debug!("cannot find tag from empty uuid");
            return None;
        }
        let found = find_by(&self.tags, |t| t.uuid == uuid);
        if found.is_none() {
            debug!("no tag found for uuid {uuid}");
        }
        found
    }

    pub fn list_tags_for_keys(&self, keys: &[String]) -> Vec<Handle<Tag>> {
        list_for_keys("Tag", &self.tags, keys, |t| t.uuid.clone())
    }

    pub fn create_tag(&self) -> Handle<Tag> {
        let mut tag = Tag::default();
        tag.prepare_new();
        handle(tag)
    }

    pub fn undo_create_tag(&self, tag: Handle<Tag>) {
        debug!("undo create tag {}", tag.borrow().uuid);
        drop(tag);
    }

    pub fn insert_tag(&mut self, tag: Handle<Tag>) {
        let uuid = tag.borrow().uuid.clone();
        self.tags.push(tag);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Tag,
            uuid,
        });
    }

    pub fn insert_tag_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut tag = Tag::default();
        if use_foreign_properties {
            tag.fill_from_foreign_map(map);
        } else {
            tag.fill_from_map(map);
        }
        self.insert_tag(handle(tag));
    }

    pub fn delete_tag(&mut self, tag: &Handle<Tag>) -> bool {
        let pos = match self.tags.iter().position(|rc| Rc::ptr_eq(rc, tag)) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.tags.remove(pos);
        self.emit_tag_deleted(&removed);
        true
    }

    pub fn delete_tag_by_uuid(&mut self, uuid: &str) -> bool {
        if uuid.is_empty() {
            debug!("cannot delete tag from empty uuid");
            return false;
        }
        let pos = match self.tags.iter().position(|rc| rc.borrow().uuid == uuid) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.tags.remove(pos);
        self.emit_tag_deleted(&removed);
        true
    }

    pub fn delete_all_tags(&mut self) {
        for tag in std::mem::take(&mut self.tags) {
            self.emit_tag_deleted(&tag);
        }
    }

    fn emit_tag_deleted(&self, tag: &Handle<Tag>) {
        let uuid = tag.borrow().uuid.clone();
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Tag,
            key: uuid.clone(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Tag,
            uuid,
        });
    }

    // ---------------------------------------------------------------------
    // X T R A S
    // ---------------------------------------------------------------------

    pub fn load_xtras_from_cache(&mut self) -> Result<usize, StoreError> {
        debug!("start loading xtras from cache");
        self.xtras.clear();
        let maps = cache::read_collection(&self.settings, CACHE_XTRAS)?;
        for m in &maps {
            let mut xtras = Xtras::default();
            xtras.fill_from_cache_map(m);
            self.xtras.push(handle(xtras));
        }
        debug!("created xtras: {}", self.xtras.len());
        Ok(self.xtras.len())
    }

    pub fn save_xtras_to_cache(&self) -> Result<(), StoreError> {
        debug!("now caching xtras: {}", self.xtras.len());
        let maps: Vec<DataMap> = self.xtras.iter().map(|x| x.borrow().to_cache_map()).collect();
        cache::write_collection(&self.settings, CACHE_XTRAS, maps)
    }

    pub fn all_xtras(&self) -> &[Handle<Xtras>] {
        &self.xtras
    }

    pub fn xtras_count(&self) -> usize {
        self.xtras.len()
    }

    /// id is the domain key.
    pub fn find_xtras_by_id(&self, id: i32) -> Option<Handle<Xtras>> {
        let found = find_by(&self.xtras, |x| x.id == id);
        if found.is_none() {
            debug!("no xtras found for id {id}");
        }
        found
    }

    pub fn list_xtras_for_keys(&self, keys: &[String]) -> Vec<Handle<Xtras>> {
        list_for_keys("Xtras", &self.xtras, keys, |x| x.id.to_string())
    }

    pub fn create_xtras(&self) -> Handle<Xtras> {
        let mut xtras = Xtras::default();
        xtras.prepare_new();
        handle(xtras)
    }

    pub fn undo_create_xtras(&self, xtras: Handle<Xtras>) {
        debug!("undo create xtras {}", xtras.borrow().id);
        drop(xtras);
    }

    pub fn insert_xtras(&mut self, xtras: Handle<Xtras>) {
        let uuid = xtras.borrow().uuid.clone();
        self.xtras.push(xtras);
        self.hub.emit(&StoreEvent::Added {
            kind: EntityKind::Xtras,
            uuid,
        });
    }

    pub fn insert_xtras_from_map(&mut self, map: &DataMap, use_foreign_properties: bool) {
        let mut xtras = Xtras::default();
        if use_foreign_properties {
            xtras.fill_from_foreign_map(map);
        } else {
            xtras.fill_from_map(map);
        }
        self.insert_xtras(handle(xtras));
    }

    pub fn delete_xtras(&mut self, xtras: &Handle<Xtras>) -> bool {
        let pos = match self.xtras.iter().position(|rc| Rc::ptr_eq(rc, xtras)) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.xtras.remove(pos);
        self.emit_xtras_deleted(&removed);
        true
    }

    pub fn delete_xtras_by_id(&mut self, id: i32) -> bool {
        let pos = match self.xtras.iter().position(|rc| rc.borrow().id == id) {
            Some(pos) => pos,
            None => return false,
        };
        let removed = self.xtras.remove(pos);
        self.emit_xtras_deleted(&removed);
        true
    }

    pub fn delete_all_xtras(&mut self) {
        for xtras in std::mem::take(&mut self.xtras) {
            self.emit_xtras_deleted(&xtras);
        }
    }

    fn emit_xtras_deleted(&self, xtras: &Handle<Xtras>) {
        let (id, uuid) = {
            let x = xtras.borrow();
            (x.id, x.uuid.clone())
        };
        self.hub.emit(&StoreEvent::DeletedByKey {
            kind: EntityKind::Xtras,
            key: id.to_string(),
        });
        self.hub.emit(&StoreEvent::Deleted {
            kind: EntityKind::Xtras,
            uuid,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn manager() -> (DataManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let dm = DataManager::new(Settings::new(dir.path()));
        (dm, dir)
    }

    fn insert_customer_with_id(dm: &mut DataManager, id: i32, name: &str) -> Handle<Customer> {
        let customer = dm.create_customer();
        customer.borrow_mut().id = id;
        customer.borrow_mut().company_name = name.into();
        dm.insert_customer(customer.clone());
        customer
    }

    #[test]
    fn test_find_first_match_wins_on_duplicate_domain_keys() {
        let (mut dm, _dir) = manager();
        let first = insert_customer_with_id(&mut dm, 7, "First AG");
        let _second = insert_customer_with_id(&mut dm, 7, "Second AG");

        // linear scan: the first-inserted customer wins the tie
        let found = dm.find_customer_by_id(7).unwrap();
        assert!(Rc::ptr_eq(&found, &first));
        assert_eq!(found.borrow().company_name, "First AG");
    }

    #[test]
    fn test_list_for_keys_dedups_and_warns_on_misses() {
        let (mut dm, _dir) = manager();
        insert_customer_with_id(&mut dm, 1, "A");
        insert_customer_with_id(&mut dm, 2, "B");

        let keys = vec!["1".to_string(), "1".to_string(), "2".into(), "99".into()];
        let found = dm.list_customers_for_keys(&keys);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_delete_by_missing_key_reports_false() {
        let (mut dm, _dir) = manager();
        assert!(!dm.delete_customer_by_id(1));
        assert!(!dm.delete_order_by_nr(1));
        assert!(!dm.delete_tag_by_uuid("missing"));
        assert!(!dm.delete_tag_by_uuid(""));
    }

    #[test]
    fn test_events_fire_in_order() {
        let (mut dm, _dir) = manager();
        let seen: Rc<RefCell<Vec<StoreEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        dm.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let customer = insert_customer_with_id(&mut dm, 5, "C");
        let uuid = customer.borrow().uuid.clone();
        assert!(dm.delete_customer_by_id(5));

        let events = seen.borrow();
        assert_eq!(
            *events,
            vec![
                StoreEvent::Added {
                    kind: EntityKind::Customer,
                    uuid: uuid.clone()
                },
                StoreEvent::DeletedByKey {
                    kind: EntityKind::Customer,
                    key: "5".into()
                },
                StoreEvent::Deleted {
                    kind: EntityKind::Customer,
                    uuid
                },
            ]
        );
    }

    #[test]
    fn test_departments_flat_sees_direct_tree_mutations() {
        let (mut dm, _dir) = manager();
        let root = dm.create_department();
        root.borrow_mut().id = 1;
        dm.insert_department(root.clone());

        // mutate the tree directly, bypassing the store
        let child = Department::create_child(&root);
        child.borrow_mut().id = 10;
        Department::add_child(&root, child);

        // the on-demand flatten picks the new child up immediately
        assert_eq!(dm.departments_flat().len(), 2);
        assert!(dm.find_department_by_id(10).is_some());
    }

    #[test]
    fn test_undo_create_releases_entity() {
        let (dm, _dir) = manager();
        let order = dm.create_order();
        let probe = Rc::downgrade(&order);
        dm.undo_create_order(order);
        assert!(probe.upgrade().is_none());
    }
}
