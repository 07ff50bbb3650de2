//! orderstore: offline-first data layer for a mobile order application
//!
//! Entities (orders, customers, topics, departments, tags, extras) are
//! cached on device as JSON documents, with one high-volume read-only
//! collection (tags) backed by a chunked SQLite bulk cache. Cross-entity
//! references are persisted as plain domain keys and resolved to live
//! handles on demand by the [`store::DataManager`].

pub mod core;
pub mod entities;
pub mod store;

pub use crate::core::config::Settings;
pub use crate::core::entity::{DataObject, EntityKind, MapKind, OrderState};
pub use crate::core::error::StoreError;
pub use crate::core::map::DataMap;
pub use crate::store::events::{StoreEvent, SubscriptionId};
pub use crate::store::DataManager;
