//! Record schemas for cloudmenu entities.
//!
//! Record types and field names are the wire contract with the record store.
//! Every backend must persist them exactly as written here.
//!
//! # Record Schemas
//!
//! ## Restaurants
//! ```text
//! {
//!   "name": "string"
//! }
//! ```
//!
//! ## MenuItems
//! ```text
//! {
//!   "name": "string",
//!   "restaurant": reference -> Restaurants
//! }
//! ```

/// Schema of a restaurant record.
pub struct RestaurantSchema;

impl RestaurantSchema {
    pub const RECORD_TYPE: &'static str = "Restaurants";
    pub const NAME: &'static str = "name";
}

/// Schema of a menu-item record.
pub struct MenuItemSchema;

impl MenuItemSchema {
    pub const RECORD_TYPE: &'static str = "MenuItems";
    pub const NAME: &'static str = "name";
    /// Reference to the owning restaurant record.
    pub const RESTAURANT: &'static str = "restaurant";
}
