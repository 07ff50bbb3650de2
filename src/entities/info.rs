//! Info entity - optional note contained in an Order

use serde_json::json;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::core::relation::{Handle, WeakHandle};
use crate::entities::order::Order;

#[derive(Default)]
pub struct Info {
    pub uuid: String,
    pub remarks: String,
    order: WeakHandle<Order>,
}

impl Info {
    /// The Order containing this Info (back-reference, set at attach time).
    pub fn order(&self) -> Option<Handle<Order>> {
        self.order.upgrade()
    }

    pub(crate) fn set_order(&mut self, order: WeakHandle<Order>) {
        self.order = order;
    }
}

impl DataObject for Info {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty()
    }

    fn fill(&mut self, m: &DataMap, _kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(remarks) = map::get_string(m, "remarks") {
            self.remarks = remarks;
        }
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("remarks".into(), json!(self.remarks));
        m
    }
}
