//! Geo value objects owned by Customer
//!
//! Both types are always-present placeholders on their owner: a fresh
//! instance already carries a uuid but is semantically empty/invalid until
//! filled. All three map shapes are identical for them.

use serde_json::json;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::new_uuid;
use crate::core::map::{self, DataMap};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate, optionally with altitude (3D).
#[derive(Debug, Clone)]
pub struct GeoCoordinate {
    pub uuid: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

impl Default for GeoCoordinate {
    fn default() -> Self {
        Self {
            uuid: new_uuid(),
            latitude: None,
            longitude: None,
            altitude: None,
        }
    }
}

impl GeoCoordinate {
    pub fn is_valid(&self) -> bool {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon),
            _ => false,
        }
    }

    pub fn is_3d(&self) -> bool {
        self.altitude.is_some()
    }

    pub fn as_text(&self) -> String {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => match self.altitude {
                Some(alt) => format!("{lat}, {lon}, {alt}m"),
                None => format!("{lat}, {lon}"),
            },
            _ => String::new(),
        }
    }

    /// Distance in meters to another coordinate (haversine, altitude not
    /// used). Returns `None` when either side is invalid.
    pub fn distance_to(&self, other: &GeoCoordinate) -> Option<f64> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let (lat1, lon1) = (self.latitude?.to_radians(), self.longitude?.to_radians());
        let (lat2, lon2) = (other.latitude?.to_radians(), other.longitude?.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        Some(2.0 * EARTH_RADIUS_M * a.sqrt().asin())
    }

    /// Reset to the empty placeholder, keeping the uuid.
    pub fn clear(&mut self) {
        self.latitude = None;
        self.longitude = None;
        self.altitude = None;
    }
}

impl DataObject for GeoCoordinate {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        GeoCoordinate::is_valid(self)
    }

    fn fill(&mut self, m: &DataMap, _kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            if !uuid.is_empty() {
                self.uuid = uuid;
            }
        }
        // the 0.000-prefix guard keeps legacy placeholder values out
        if let Some(lat) = map::get_geo_f64(m, "latitude") {
            self.latitude = Some(lat);
        }
        if let Some(lon) = map::get_geo_f64(m, "longitude") {
            self.longitude = Some(lon);
        }
        if let Some(alt) = map::get_geo_f64(m, "altitude") {
            self.altitude = Some(alt);
        }
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        if self.is_valid() {
            m.insert("uuid".into(), json!(self.uuid));
            m.insert("latitude".into(), json!(self.latitude));
            m.insert("longitude".into(), json!(self.longitude));
            if self.is_3d() {
                m.insert("altitude".into(), json!(self.altitude));
            }
        }
        m
    }
}

/// A civic address. Empty placeholder until any field is set.
#[derive(Debug, Clone)]
pub struct GeoAddress {
    pub uuid: String,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub county: String,
    pub district: String,
    pub postcode: String,
    pub state: String,
    pub street: String,
}

impl Default for GeoAddress {
    fn default() -> Self {
        Self {
            uuid: new_uuid(),
            city: String::new(),
            country: String::new(),
            country_code: String::new(),
            county: String::new(),
            district: String::new(),
            postcode: String::new(),
            state: String::new(),
            street: String::new(),
        }
    }
}

impl GeoAddress {
    pub fn is_empty(&self) -> bool {
        self.city.is_empty()
            && self.country.is_empty()
            && self.country_code.is_empty()
            && self.county.is_empty()
            && self.district.is_empty()
            && self.postcode.is_empty()
            && self.state.is_empty()
            && self.street.is_empty()
    }

    pub fn as_text(&self) -> String {
        let parts: Vec<&str> = [
            self.street.as_str(),
            self.postcode.as_str(),
            self.city.as_str(),
            self.district.as_str(),
            self.county.as_str(),
            self.state.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
        parts.join(", ")
    }

    /// Reset to the empty placeholder, keeping the uuid.
    pub fn clear(&mut self) {
        self.city.clear();
        self.country.clear();
        self.country_code.clear();
        self.county.clear();
        self.district.clear();
        self.postcode.clear();
        self.state.clear();
        self.street.clear();
    }
}

impl DataObject for GeoAddress {
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
            if !uuid.is_empty() {
                self.uuid = uuid;
            }
        }
        self.clear();
        if let Some(v) = map::get_string(m, "city") {
            self.city = v;
        }
        if let Some(v) = map::get_string(m, "country") {
            self.country = v;
        }
        if let Some(v) = map::get_string(m, "countryCode") {
            self.country_code = v;
        }
        if let Some(v) = map::get_string(m, "county") {
            self.county = v;
        }
        if let Some(v) = map::get_string(m, "district") {
            self.district = v;
        }
        if let Some(v) = map::get_string(m, "postcode") {
            self.postcode = v;
        }
        if let Some(v) = map::get_string(m, "state") {
            self.state = v;
        }
        if let Some(v) = map::get_string(m, "street") {
            self.street = v;
        }
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        if self.is_empty() {
            return m;
        }
        m.insert("uuid".into(), json!(self.uuid));
        for (key, value) in [
            ("city", &self.city),
            ("country", &self.country),
            ("countryCode", &self.country_code),
            ("county", &self.county),
            ("district", &self.district),
            ("postcode", &self.postcode),
            ("state", &self.state),
            ("street", &self.street),
        ] {
            if !value.is_empty() {
                m.insert(key.into(), json!(value));
            }
        }
        m
    }
}
