//! Item entity - order position containing sub-items

use std::rc::Rc;

use serde_json::{json, Value};
use tracing::debug;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::core::relation::{handle, Handle, OwnedList, WeakHandle};
use crate::entities::order::Order;
use crate::entities::subitem::SubItem;

pub struct Item {
    pub uuid: String,
    pub pos_nr: i32,
    pub name: String,
    pub quantity: f64,
    sub_items: OwnedList<SubItem>,
    order: WeakHandle<Order>,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            pos_nr: -1,
            name: String::new(),
            quantity: -1.0,
            sub_items: OwnedList::default(),
            order: WeakHandle::new(),
        }
    }
}

impl Item {
    /// The Order containing this Item (back-reference, set at attach time).
    pub fn order(&self) -> Option<Handle<Order>> {
        self.order.upgrade()
    }

    pub(crate) fn set_order(&mut self, order: WeakHandle<Order>) {
        self.order = order;
    }

    /// Wire the back-references of the contained sub-items.
    pub fn attach(item: &Handle<Item>) {
        let weak = Rc::downgrade(item);
        for sub in item.borrow().sub_items.iter() {
            sub.borrow_mut().set_item(weak.clone());
        }
    }

    pub fn sub_items(&self) -> &OwnedList<SubItem> {
        &self.sub_items
    }

    pub fn sub_items_count(&self) -> usize {
        self.sub_items.len()
    }

    /// Create a sub-item attached to this item but not yet added to it.
    /// Call [`Item::add_sub_item`] on success or drop it to discard.
    pub fn create_sub_item(item: &Handle<Item>) -> Handle<SubItem> {
        let mut sub = SubItem::default();
        sub.prepare_new();
        sub.set_item(Rc::downgrade(item));
        handle(sub)
    }

    pub fn add_sub_item(item: &Handle<Item>, sub: Handle<SubItem>) {
        sub.borrow_mut().set_item(Rc::downgrade(item));
        item.borrow_mut().sub_items.push(sub);
    }

    /// Sub-items are contained: removal destroys them.
    pub fn remove_from_sub_items(&mut self, sub: &Handle<SubItem>) -> bool {
        let ok = self.sub_items.remove(sub);
        if !ok {
            debug!("sub item not found in sub items");
        }
        ok
    }

    pub fn remove_from_sub_items_by_uuid(&mut self, uuid: &str) -> bool {
        let ok = self.sub_items.remove_by(|s| s.uuid == uuid);
        if !ok {
            debug!("uuid not found in sub items: {uuid}");
        }
        ok
    }

    pub fn clear_sub_items(&mut self) {
        self.sub_items.clear();
    }

    fn sub_items_as_list(&self, kind: MapKind) -> Vec<Value> {
        self.sub_items
            .iter()
            .map(|s| Value::Object(s.borrow().export(kind)))
            .collect()
    }
}

impl DataObject for Item {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty() && self.pos_nr != -1 && !self.name.is_empty() && self.quantity != -1.0
    }

    fn fill(&mut self, m: &DataMap, kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(nr) = map::get_i32(m, "posNr") {
            self.pos_nr = nr;
        }
        if let Some(name) = map::get_string(m, "name") {
            self.name = name;
        }
        if let Some(quantity) = map::get_f64(m, "quantity") {
            self.quantity = quantity;
        }
        self.sub_items.clear();
        for sub_map in map::get_map_list(m, "subItems") {
            let mut sub = SubItem::default();
            sub.fill(sub_map, kind);
            self.sub_items.push(handle(sub));
        }
    }

    fn export(&self, kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("posNr".into(), json!(self.pos_nr));
        m.insert("name".into(), json!(self.name));
        m.insert("quantity".into(), json!(self.quantity));
        m.insert("subItems".into(), Value::Array(self.sub_items_as_list(kind)));
        m
    }
}
