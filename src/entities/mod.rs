//! Entity type definitions
//!
//! Root entities managed by the store:
//! - [`Order`] - orders with contained positions and lazy cross-references
//! - [`Customer`] - customers with geo coordinate and address
//! - [`Topic`] - classification topics with independent sub-topics
//! - [`Department`] - read-only department tree
//! - [`Tag`] - read-only high-volume tag collection (SQLite bulk cache)
//! - [`Xtras`] - auxiliary reference records
//!
//! Contained children (never stored on their own): [`Item`], [`SubItem`],
//! [`Info`]. Value objects: [`GeoCoordinate`], [`GeoAddress`].

pub mod customer;
pub mod department;
pub mod geo;
pub mod info;
pub mod item;
pub mod order;
pub mod subitem;
pub mod tag;
pub mod topic;
pub mod xtras;

pub use customer::Customer;
pub use department::Department;
pub use geo::{GeoAddress, GeoCoordinate};
pub use info::Info;
pub use item::Item;
pub use order::Order;
pub use subitem::SubItem;
pub use tag::{Tag, TagColumns};
pub use topic::Topic;
pub use xtras::Xtras;
