//! SubItem entity - contained child of an Item

use serde_json::json;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::core::relation::{Handle, WeakHandle};
use crate::entities::item::Item;

pub struct SubItem {
    pub uuid: String,
    pub sub_pos_nr: i32,
    pub description: String,
    pub barcode: String,
    item: WeakHandle<Item>,
}

impl Default for SubItem {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            sub_pos_nr: -1,
            description: String::new(),
            barcode: String::new(),
            item: WeakHandle::new(),
        }
    }
}

impl SubItem {
    /// The Item containing this SubItem (back-reference, set at attach time).
    pub fn item(&self) -> Option<Handle<Item>> {
        self.item.upgrade()
    }

    pub(crate) fn set_item(&mut self, item: WeakHandle<Item>) {
        self.item = item;
    }
}

impl DataObject for SubItem {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty()
            && self.sub_pos_nr != -1
            && !self.description.is_empty()
            && !self.barcode.is_empty()
    }

    fn fill(&mut self, m: &DataMap, _kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(nr) = map::get_i32(m, "subPosNr") {
            self.sub_pos_nr = nr;
        }
        if let Some(description) = map::get_string(m, "description") {
            self.description = description;
        }
        if let Some(barcode) = map::get_string(m, "barcode") {
            self.barcode = barcode;
        }
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("subPosNr".into(), json!(self.sub_pos_nr));
        m.insert("description".into(), json!(self.description));
        m.insert("barcode".into(), json!(self.barcode));
        m
    }
}
