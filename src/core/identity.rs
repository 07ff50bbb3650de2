//! Entity identity: cache-level surrogate keys
//!
//! Every entity carries a `uuid` as its stable cache identity. The cache
//! format stores the 36-character hyphenated form without enclosing braces.

use uuid::Uuid;

/// Generate a fresh 36-character uuid (hyphenated, no braces).
pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Returns a replacement uuid when `current` is empty.
///
/// Deserializers call this after reading the `uuid` key so an entity never
/// leaves `fill_from_*` or `prepare_new` without an identity.
pub fn ensure_uuid(current: &str) -> Option<String> {
    if current.is_empty() {
        Some(new_uuid())
    } else {
        None
    }
}
