//! Customer entity

use serde_json::{json, Value};

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::entities::geo::{GeoAddress, GeoCoordinate};

/// A customer with its geo coordinate and address.
///
/// Both geo members are always-present placeholders; "no coordinate" means
/// an invalid placeholder, "no address" an empty one.
pub struct Customer {
    pub uuid: String,
    /// Domain key referenced by `Order.customerId`.
    pub id: i32,
    pub company_name: String,
    pub coordinate: GeoCoordinate,
    pub geo_address: GeoAddress,
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            id: -1,
            company_name: String::new(),
            coordinate: GeoCoordinate::default(),
            geo_address: GeoAddress::default(),
        }
    }
}

impl Customer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_coordinate(&self) -> bool {
        self.coordinate.is_valid()
    }

    pub fn has_geo_address(&self) -> bool {
        !self.geo_address.is_empty()
    }

    /// Reset the coordinate to an invalid placeholder.
    pub fn delete_coordinate(&mut self) {
        self.coordinate = GeoCoordinate::default();
    }

    /// Reset the address to an empty placeholder.
    pub fn delete_geo_address(&mut self) {
        self.geo_address = GeoAddress::default();
    }
}

impl DataObject for Customer {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty() && self.id != -1
    }

    fn fill(&mut self, m: &DataMap, kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(id) = map::get_i32(m, "id") {
            self.id = id;
        }
        if let Some(name) = map::get_string(m, "companyName") {
            self.company_name = name;
        }
        if let Some(coordinate_map) = map::get_map(m, "coordinate") {
            if !coordinate_map.is_empty() {
                let mut coordinate = GeoCoordinate::default();
                coordinate.fill(coordinate_map, kind);
                self.coordinate = coordinate;
            }
        }
        if let Some(address_map) = map::get_map(m, "geoAddress") {
            if !address_map.is_empty() {
                let mut address = GeoAddress::default();
                address.fill(address_map, kind);
                self.geo_address = address;
            }
        }
    }

    fn export(&self, kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("id".into(), json!(self.id));
        m.insert("companyName".into(), json!(self.company_name));
        // an invalid placeholder coordinate is not persisted
        if self.coordinate.is_valid() {
            m.insert("coordinate".into(), Value::Object(self.coordinate.export(kind)));
        }
        m.insert("geoAddress".into(), Value::Object(self.geo_address.export(kind)));
        m
    }
}
