//! Core module - fundamental types shared by entities and the store

pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod map;
pub mod relation;

pub use config::Settings;
pub use entity::{DataObject, EntityKind, MapKind, OrderState};
pub use error::StoreError;
pub use map::DataMap;
pub use relation::{LazyRef, OwnedList, RefList, SharedList};
