//! Generic map shape used by all entity codecs
//!
//! Cache files, wire payloads and in-memory exports all move through the
//! same string-keyed map of dynamically typed values. The getters here are
//! deliberately lenient: a numeric field stored as a string still parses,
//! a malformed value degrades to `None` instead of failing the surrounding
//! deserialization.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

/// Ordered string-keyed map of dynamically typed values.
pub type DataMap = serde_json::Map<String, Value>;

/// Date format used for all persisted dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn get_i32(map: &DataMap, key: &str) -> Option<i32> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64().map(|v| v as i32),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

pub fn get_f64(map: &DataMap, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn get_bool(map: &DataMap, key: &str) -> Option<bool> {
    match map.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn get_string(map: &DataMap, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Dates always travel as `yyyy-MM-dd` strings. An unparsable value
/// collapses to "no date" rather than an error.
pub fn get_date(map: &DataMap, key: &str) -> Option<NaiveDate> {
    let raw = get_string(map, key)?;
    match NaiveDate::parse_from_str(&raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            debug!("date is not valid for string: {raw}");
            None
        }
    }
}

/// Missing or non-array values yield an empty list; non-string elements
/// are rendered via their number form where possible and skipped otherwise.
pub fn get_string_list(map: &DataMap, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn get_i32_list(map: &DataMap, key: &str) -> Vec<i32> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) => n.as_i64().map(|x| x as i32),
                Value::String(s) => s.trim().parse::<i32>().ok(),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn get_map<'a>(map: &'a DataMap, key: &str) -> Option<&'a DataMap> {
    match map.get(key)? {
        Value::Object(inner) => Some(inner),
        _ => None,
    }
}

pub fn get_list<'a>(map: &'a DataMap, key: &str) -> Option<&'a Vec<Value>> {
    match map.get(key)? {
        Value::Array(list) => Some(list),
        _ => None,
    }
}

/// Child maps of a list value; non-object elements are skipped.
pub fn get_map_list<'a>(map: &'a DataMap, key: &str) -> Vec<&'a DataMap> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Object(inner) => Some(inner),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Geo double with the legacy placeholder guard: the value is rendered to
/// its string form first, and anything empty or beginning with `0.000` is
/// treated as absent. This keeps default placeholder coordinates from older
/// caches from overwriting fields on load. Do not extend this guard to
/// other numeric fields.
pub fn get_geo_f64(map: &DataMap, key: &str) -> Option<f64> {
    let raw = match map.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if raw.is_empty() || raw.starts_with("0.000") {
        return None;
    }
    raw.trim().parse::<f64>().ok()
}
