//! List controllers for the two screens.
//!
//! Both controllers wrap the same [`ListController`] engine and differ only
//! in what they query and how they build new records.

mod error;
mod list;
mod menu_item;
mod restaurant;

pub use error::ListError;
pub use list::{ListController, ListEntity, ListEvent, ListKind, LoadState, Operation};
pub use menu_item::{MenuItemList, MenuItemListController};
pub use restaurant::{CreatedRestaurant, PendingMenuItem, RestaurantList, RestaurantListController};
