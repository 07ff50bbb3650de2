//! Xtras entity - auxiliary reference records

use serde_json::json;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};

#[derive(Debug, Clone)]
pub struct Xtras {
    pub uuid: String,
    /// Domain key referenced by `Order.extras`.
    pub id: i32,
    pub name: String,
    pub text: Vec<String>,
    pub values: Vec<i32>,
}

impl Default for Xtras {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            id: -1,
            name: String::new(),
            text: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl DataObject for Xtras {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty() && self.id != -1
    }

    fn fill(&mut self, m: &DataMap, _kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(id) = map::get_i32(m, "id") {
            self.id = id;
        }
        if let Some(name) = map::get_string(m, "name") {
            self.name = name;
        }
        self.text = map::get_string_list(m, "text");
        self.values = map::get_i32_list(m, "values");
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("id".into(), json!(self.id));
        m.insert("name".into(), json!(self.name));
        m.insert("text".into(), json!(self.text));
        m.insert("values".into(), json!(self.values));
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let mut x = Xtras::default();
        x.prepare_new();
        x.id = 12;
        x.name = "weekend delivery".into();
        x.text = vec!["a".into(), "b".into()];
        x.values = vec![1, 2, 3];

        let mut back = Xtras::default();
        back.fill_from_cache_map(&x.to_cache_map());
        assert_eq!(back.uuid, x.uuid);
        assert_eq!(back.id, 12);
        assert_eq!(back.text, x.text);
        assert_eq!(back.values, x.values);
        assert!(back.is_valid());
    }

    #[test]
    fn test_legacy_map_without_uuid_loads() {
        // caches written before uuids were added to this type
        let mut m = DataMap::new();
        m.insert("id".into(), json!(4));
        m.insert("name".into(), json!("legacy"));
        let mut x = Xtras::default();
        x.fill_from_cache_map(&m);
        assert_eq!(x.id, 4);
        assert_eq!(x.uuid.len(), 36);
    }

    #[test]
    fn test_missing_id_is_invalid() {
        let mut x = Xtras::default();
        x.prepare_new();
        assert!(!x.is_valid());
    }
}
