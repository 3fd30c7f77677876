mod menu_item;
mod record;
mod restaurant;

pub use menu_item::MenuItem;
pub use record::{FieldValue, Record, RecordError, RecordId, Reference};
pub use restaurant::Restaurant;
