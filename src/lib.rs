//! Cloudmenu Library
//!
//! Restaurant and menu-item lists kept in sync with a record store.

pub mod config;
pub mod controller;
pub mod models;
pub mod schema;
pub mod store;

pub use config::{Config, ConfigError, ConfigSource, ConfigValue};
pub use controller::{
    CreatedRestaurant, ListError, ListEvent, LoadState, MenuItemListController, Operation,
    PendingMenuItem, RestaurantListController,
};
pub use models::{MenuItem, Record, RecordId, Reference, Restaurant};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, StoreError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
