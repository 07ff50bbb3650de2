//! DataObject trait - common interface for all entity types

use crate::core::map::DataMap;
use tracing::warn;

/// Which map shape a codec operation targets.
///
/// `Full` and `Foreign` carry every field including transient ones;
/// `Cache` is the persisted subset. `Foreign` additionally switches to the
/// external wire key names where they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Full,
    Foreign,
    Cache,
}

/// Common interface for all entities.
///
/// Every entity converts to and from the three map shapes and guarantees a
/// non-empty `uuid` after `fill` or `prepare_new`.
pub trait DataObject {
    fn uuid(&self) -> &str;

    /// Assign a fresh identity to a newly created entity.
    fn prepare_new(&mut self);

    /// Checks that all mandatory attributes and domain keys are filled.
    fn is_valid(&self) -> bool;

    fn fill(&mut self, map: &DataMap, kind: MapKind);

    fn export(&self, kind: MapKind) -> DataMap;

    fn fill_from_map(&mut self, map: &DataMap) {
        self.fill(map, MapKind::Full);
    }

    fn fill_from_foreign_map(&mut self, map: &DataMap) {
        self.fill(map, MapKind::Foreign);
    }

    fn fill_from_cache_map(&mut self, map: &DataMap) {
        self.fill(map, MapKind::Cache);
    }

    fn to_map(&self) -> DataMap {
        self.export(MapKind::Full)
    }

    fn to_foreign_map(&self) -> DataMap {
        self.export(MapKind::Foreign)
    }

    fn to_cache_map(&self) -> DataMap {
        self.export(MapKind::Cache)
    }
}

/// Root entity kinds managed by the store, used in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Order,
    Customer,
    Topic,
    Department,
    Tag,
    Xtras,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Order => "Order",
            EntityKind::Customer => "Customer",
            EntityKind::Topic => "Topic",
            EntityKind::Department => "Department",
            EntityKind::Tag => "Tag",
            EntityKind::Xtras => "Xtras",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order processing state.
///
/// Persisted as an int; foreign systems may also deliver the literal
/// tokens. `NoValue` is the -1 sentinel for "no state known".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderState {
    #[default]
    New,
    Confirmed,
    Delivered,
    Closed,
    NoValue,
}

impl OrderState {
    pub const NO_VALUE: i32 = -1;

    pub fn as_i32(&self) -> i32 {
        match self {
            OrderState::New => 0,
            OrderState::Confirmed => 1,
            OrderState::Delivered => 2,
            OrderState::Closed => 3,
            OrderState::NoValue => Self::NO_VALUE,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => OrderState::New,
            1 => OrderState::Confirmed,
            2 => OrderState::Delivered,
            3 => OrderState::Closed,
            _ => OrderState::NoValue,
        }
    }

    /// Decode the wire token. Tokens are case-sensitive; anything
    /// unrecognized yields the sentinel, never an error.
    pub fn from_token(token: &str) -> Self {
        match token {
            "NEW" => OrderState::New,
            "CONFIRMED" => OrderState::Confirmed,
            "DELIVERED" => OrderState::Delivered,
            "CLOSED" => OrderState::Closed,
            "" => OrderState::NoValue,
            other => {
                warn!("state wrong enum value as string: {other}");
                OrderState::NoValue
            }
        }
    }
}
