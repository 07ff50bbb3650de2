//! Order entity - root aggregate with contained positions and lazy
//! cross-references
//!
//! An order embeds its positions (and optional info note) but references
//! topic, extras, customer and department only by domain key, and tags by
//! uuid key list. The keys are resolved to live handles by the store's
//! resolution pass; see [`crate::core::relation`] for the reference state
//! machine.

use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::entity::{DataObject, MapKind, OrderState};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap, DATE_FORMAT};
use crate::core::relation::{handle, Handle, LazyRef, OwnedList, RefList};
use crate::entities::customer::Customer;
use crate::entities::department::Department;
use crate::entities::info::Info;
use crate::entities::item::Item;
use crate::entities::tag::Tag;
use crate::entities::topic::Topic;
use crate::entities::xtras::Xtras;

pub struct Order {
    pub uuid: String,
    /// Domain key (order number).
    pub nr: i32,
    pub express_order: bool,
    pub title: String,
    pub order_date: Option<NaiveDate>,
    pub state: OrderState,
    /// Transient processing marker, never written to the cache.
    pub processing_state: i32,
    pub domains: Vec<String>,
    info: Option<Handle<Info>>,
    topic_id: LazyRef<Topic>,
    extras: LazyRef<Xtras>,
    customer_id: LazyRef<Customer>,
    dep_id: LazyRef<Department>,
    positions: OwnedList<Item>,
    tags: RefList<Tag>,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            nr: -1,
            express_order: false,
            title: String::new(),
            order_date: None,
            state: OrderState::default(),
            processing_state: 0,
            domains: Vec::new(),
            info: None,
            topic_id: LazyRef::default(),
            extras: LazyRef::default(),
            customer_id: LazyRef::default(),
            dep_id: LazyRef::default(),
            positions: OwnedList::default(),
            tags: RefList::default(),
        }
    }
}

impl Order {
    /// True when no reference still needs a resolution pass: every scalar
    /// reference is absent or resolved and the tag keys are resolved.
    pub fn is_all_resolved(&self) -> bool {
        if self.topic_id.has() && !self.topic_id.is_resolved() {
            return false;
        }
        if self.extras.has() && !self.extras.is_resolved() {
            return false;
        }
        if self.customer_id.has() && !self.customer_id.is_resolved() {
            return false;
        }
        if self.dep_id.has() && !self.dep_id.is_resolved() {
            return false;
        }
        self.tags.are_resolved()
    }

    pub fn has_order_date(&self) -> bool {
        self.order_date.is_some()
    }

    /// Wire the back-references of contained children (positions and info).
    pub fn attach(order: &Handle<Order>) {
        let weak = Rc::downgrade(order);
        let inner = order.borrow();
        for item in inner.positions.iter() {
            item.borrow_mut().set_order(weak.clone());
            Item::attach(item);
        }
        if let Some(info) = &inner.info {
            info.borrow_mut().set_order(weak.clone());
        }
    }

    // ---------------------------------------------------------------------
    // info (contained, optional)
    // ---------------------------------------------------------------------

    pub fn info(&self) -> Option<Handle<Info>> {
        self.info.clone()
    }

    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    /// Create an info attached to this order but not yet set. Call
    /// [`Order::set_info`] on success or drop it to discard.
    pub fn create_info(order: &Handle<Order>) -> Handle<Info> {
        let mut info = Info::default();
        info.prepare_new();
        info.set_order(Rc::downgrade(order));
        handle(info)
    }

    pub fn undo_create_info(_info: Handle<Info>) {
        // dropping the handle releases the abandoned info
    }

    /// Replace the contained info; the previous one is dropped.
    pub fn set_info(order: &Handle<Order>, info: Handle<Info>) {
        info.borrow_mut().set_order(Rc::downgrade(order));
        order.borrow_mut().info = Some(info);
    }

    pub fn delete_info(&mut self) {
        self.info = None;
    }

    // ---------------------------------------------------------------------
    // topicId lazy reference -> Topic (domain key: id), optional
    // ---------------------------------------------------------------------

    pub fn topic_id(&self) -> i32 {
        self.topic_id.key()
    }

    pub fn set_topic_id(&mut self, topic_id: i32) {
        self.topic_id.set_key(topic_id);
    }

    pub fn remove_topic_id(&mut self) {
        self.topic_id.clear();
    }

    pub fn has_topic_id(&self) -> bool {
        self.topic_id.has()
    }

    pub fn is_topic_id_resolved(&self) -> bool {
        self.topic_id.is_resolved()
    }

    pub fn resolve_topic_id(&mut self, topic: &Handle<Topic>) {
        let key = topic.borrow().id;
        self.topic_id.resolve(topic, key);
    }

    pub fn mark_topic_id_invalid(&mut self) {
        self.topic_id.mark_invalid();
    }

    pub fn topic(&self) -> Option<Handle<Topic>> {
        self.topic_id.target()
    }

    // ---------------------------------------------------------------------
    // extras lazy reference -> Xtras (domain key: id), optional
    // ---------------------------------------------------------------------

    pub fn extras(&self) -> i32 {
        self.extras.key()
    }

    pub fn set_extras(&mut self, extras: i32) {
        self.extras.set_key(extras);
    }

    pub fn remove_extras(&mut self) {
        self.extras.clear();
    }

    pub fn has_extras(&self) -> bool {
        self.extras.has()
    }

    pub fn is_extras_resolved(&self) -> bool {
        self.extras.is_resolved()
    }

    pub fn resolve_extras(&mut self, xtras: &Handle<Xtras>) {
        let key = xtras.borrow().id;
        self.extras.resolve(xtras, key);
    }

    pub fn mark_extras_invalid(&mut self) {
        self.extras.mark_invalid();
    }

    pub fn xtras(&self) -> Option<Handle<Xtras>> {
        self.extras.target()
    }

    // ---------------------------------------------------------------------
    // customerId lazy reference -> Customer (domain key: id), mandatory
    // ---------------------------------------------------------------------

    pub fn customer_id(&self) -> i32 {
        self.customer_id.key()
    }

    pub fn set_customer_id(&mut self, customer_id: i32) {
        self.customer_id.set_key(customer_id);
    }

    pub fn remove_customer_id(&mut self) {
        self.customer_id.clear();
    }

    pub fn has_customer_id(&self) -> bool {
        self.customer_id.has()
    }

    pub fn is_customer_id_resolved(&self) -> bool {
        self.customer_id.is_resolved()
    }

    pub fn resolve_customer_id(&mut self, customer: &Handle<Customer>) {
        let key = customer.borrow().id;
        self.customer_id.resolve(customer, key);
    }

    pub fn mark_customer_id_invalid(&mut self) {
        self.customer_id.mark_invalid();
    }

    pub fn customer(&self) -> Option<Handle<Customer>> {
        self.customer_id.target()
    }

    // ---------------------------------------------------------------------
    // depId lazy reference -> Department (domain key: id), mandatory
    // ---------------------------------------------------------------------

    pub fn dep_id(&self) -> i32 {
        self.dep_id.key()
    }

    pub fn set_dep_id(&mut self, dep_id: i32) {
        self.dep_id.set_key(dep_id);
    }

    pub fn remove_dep_id(&mut self) {
        self.dep_id.clear();
    }

    pub fn has_dep_id(&self) -> bool {
        self.dep_id.has()
    }

    pub fn is_dep_id_resolved(&self) -> bool {
        self.dep_id.is_resolved()
    }

    pub fn resolve_dep_id(&mut self, department: &Handle<Department>) {
        let key = department.borrow().id;
        self.dep_id.resolve(department, key);
    }

    pub fn mark_dep_id_invalid(&mut self) {
        self.dep_id.mark_invalid();
    }

    pub fn department(&self) -> Option<Handle<Department>> {
        self.dep_id.target()
    }

    // ---------------------------------------------------------------------
    // positions (contained Items)
    // ---------------------------------------------------------------------

    pub fn positions(&self) -> &OwnedList<Item> {
        &self.positions
    }

    pub fn positions_count(&self) -> usize {
        self.positions.len()
    }

    /// Create a position attached to this order but not yet added. Call
    /// [`Order::add_position`] on success or drop it to discard.
    pub fn create_position(order: &Handle<Order>) -> Handle<Item> {
        let mut item = Item::default();
        item.prepare_new();
        item.set_order(Rc::downgrade(order));
        handle(item)
    }

    pub fn undo_create_position(_item: Handle<Item>) {
        // dropping the handle releases the abandoned item
    }

    pub fn add_position(order: &Handle<Order>, item: Handle<Item>) {
        item.borrow_mut().set_order(Rc::downgrade(order));
        Item::attach(&item);
        order.borrow_mut().positions.push(item);
    }

    pub fn add_position_from_map(order: &Handle<Order>, item_map: &DataMap) {
        let mut item = Item::default();
        item.fill_from_map(item_map);
        Order::add_position(order, handle(item));
    }

    /// Positions are contained: removal destroys the item and its
    /// sub-items.
    pub fn remove_from_positions(&mut self, item: &Handle<Item>) -> bool {
        let ok = self.positions.remove(item);
        if !ok {
            debug!("item not found in positions");
        }
        ok
    }

    pub fn remove_from_positions_by_uuid(&mut self, uuid: &str) -> bool {
        let ok = self.positions.remove_by(|i| i.uuid == uuid);
        if !ok {
            debug!("uuid not found in positions: {uuid}");
        }
        ok
    }

    pub fn clear_positions(&mut self) {
        self.positions.clear();
    }

    fn positions_as_list(&self, kind: MapKind) -> Vec<Value> {
        self.positions
            .iter()
            .map(|i| Value::Object(i.borrow().export(kind)))
            .collect()
    }

    // ---------------------------------------------------------------------
    // tags (lazy array of independent Tags: only uuid keys are persisted)
    // ---------------------------------------------------------------------

    pub fn are_tags_keys_resolved(&self) -> bool {
        self.tags.are_resolved()
    }

    pub fn tags_keys(&self) -> Vec<String> {
        self.tags.keys().to_vec()
    }

    /// Bind the resolved tags for the stored key list. No-op when already
    /// resolved, so repeated resolution passes cannot double-insert.
    pub fn resolve_tags_keys(&mut self, tags: Vec<Handle<Tag>>) {
        self.tags.resolve(tags);
    }

    pub fn tags(&self) -> Vec<Handle<Tag>> {
        self.tags.items()
    }

    pub fn tags_count(&self) -> usize {
        self.tags.len()
    }

    pub fn add_to_tags(&mut self, tag: &Handle<Tag>) {
        self.tags.add(tag);
    }

    /// Tags are independent: removal never destroys the tag.
    pub fn remove_from_tags(&mut self, tag: &Handle<Tag>) -> bool {
        let ok = self.tags.remove(tag);
        if !ok {
            debug!("tag not found in tags");
        }
        ok
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    // ---------------------------------------------------------------------
    // domains (plain string list)
    // ---------------------------------------------------------------------

    pub fn add_to_domains(&mut self, value: impl Into<String>) {
        self.domains.push(value.into());
    }

    pub fn remove_from_domains(&mut self, value: &str) -> bool {
        match self.domains.iter().position(|d| d == value) {
            Some(pos) => {
                self.domains.remove(pos);
                true
            }
            None => {
                debug!("string not found in domains: {value}");
                false
            }
        }
    }

    pub fn domains_count(&self) -> usize {
        self.domains.len()
    }
}

impl DataObject for Order {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    /// Mandatory: uuid, nr, title, order date, at least one position, and
    /// the customer and department references. Topic, extras and tags are
    /// optional.
    fn is_valid(&self) -> bool {
        if self.uuid.is_empty() {
            return false;
        }
        if self.nr == -1 {
            return false;
        }
        if self.title.is_empty() {
            return false;
        }
        if self.order_date.is_none() {
            return false;
        }
        if self.positions.is_empty() {
            return false;
        }
        if self.customer_id.key() == -1 {
            return false;
        }
        if self.dep_id.key() == -1 {
            return false;
        }
        true
    }

    fn fill(&mut self, m: &DataMap, kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(nr) = map::get_i32(m, "nr") {
            self.nr = nr;
        }
        if let Some(express) = map::get_bool(m, "expressOrder") {
            self.express_order = express;
        }
        if let Some(title) = map::get_string(m, "title") {
            self.title = title;
        }
        if m.contains_key("orderDate") {
            // an unparsable date collapses to "no date"
            self.order_date = map::get_date(m, "orderDate");
        }
        // foreign payloads deliver the state under "STATUS"
        let state_key = match kind {
            MapKind::Foreign => "STATUS",
            _ => "state",
        };
        self.state = match m.get(state_key) {
            Some(Value::Number(n)) => {
                OrderState::from_i32(n.as_i64().unwrap_or(OrderState::NO_VALUE as i64) as i32)
            }
            // numeric strings count as ints, everything else as a token
            Some(Value::String(s)) => match s.trim().parse::<i32>() {
                Ok(v) => OrderState::from_i32(v),
                Err(_) => OrderState::from_token(s),
            },
            _ => OrderState::NoValue,
        };
        match kind {
            MapKind::Cache => {
                // transient, absent from the cache shape
                self.processing_state = 0;
            }
            _ => {
                if let Some(processing) = map::get_i32(m, "processingState") {
                    self.processing_state = processing;
                }
            }
        }
        if let Some(info_map) = map::get_map(m, "info") {
            if !info_map.is_empty() {
                let mut info = Info::default();
                info.fill(info_map, kind);
                self.info = Some(handle(info));
            }
        }
        if let Some(topic_id) = map::get_i32(m, "topicId") {
            self.topic_id.set_key(topic_id);
        }
        if let Some(extras) = map::get_i32(m, "extras") {
            self.extras.set_key(extras);
        }
        if let Some(customer_id) = map::get_i32(m, "customerId") {
            self.customer_id.set_key(customer_id);
        }
        if let Some(dep_id) = map::get_i32(m, "depId") {
            self.dep_id.set_key(dep_id);
        }
        self.positions.clear();
        for item_map in map::get_map_list(m, "positions") {
            let mut item = Item::default();
            item.fill(item_map, kind);
            self.positions.push(handle(item));
        }
        // tags must be resolved later if there are keys
        self.tags.set_keys(map::get_string_list(m, "tags"));
        self.domains = map::get_string_list(m, "domains");
    }

    fn export(&self, kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        if self.topic_id.key() != -1 {
            m.insert("topicId".into(), json!(self.topic_id.key()));
        }
        if self.extras.key() != -1 {
            m.insert("extras".into(), json!(self.extras.key()));
        }
        if self.customer_id.key() != -1 {
            m.insert("customerId".into(), json!(self.customer_id.key()));
        }
        if self.dep_id.key() != -1 {
            m.insert("depId".into(), json!(self.dep_id.key()));
        }
        m.insert(
            "tags".into(),
            json!(self.tags.export_keys(|t| t.uuid.clone())),
        );
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("nr".into(), json!(self.nr));
        m.insert("expressOrder".into(), json!(self.express_order));
        m.insert("title".into(), json!(self.title));
        if let Some(date) = self.order_date {
            m.insert("orderDate".into(), json!(date.format(DATE_FORMAT).to_string()));
        }
        // state always travels as its int form, and always under "state":
        // the "STATUS" key is an input-only quirk of the foreign shape
        m.insert("state".into(), json!(self.state.as_i32()));
        if kind != MapKind::Cache {
            m.insert("processingState".into(), json!(self.processing_state));
        }
        m.insert("positions".into(), Value::Array(self.positions_as_list(kind)));
        if let Some(info) = &self.info {
            m.insert("info".into(), Value::Object(info.borrow().export(kind)));
        }
        m.insert("domains".into(), json!(self.domains));
        m
    }
}
