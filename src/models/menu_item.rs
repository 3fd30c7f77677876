use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Record, RecordError, RecordId, Reference};
use crate::schema::MenuItemSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: RecordId,
    pub name: String,
    pub restaurant: Reference,
}

impl MenuItem {
    /// Builds the unsaved record for a new menu item owned by `restaurant`.
    pub fn new_record(name: impl Into<String>, restaurant: Reference) -> Record {
        Record::new(MenuItemSchema::RECORD_TYPE)
            .with_field(MenuItemSchema::NAME, name.into())
            .with_field(MenuItemSchema::RESTAURANT, restaurant)
    }
}

impl TryFrom<&Record> for MenuItem {
    type Error = RecordError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        record.expect_type(MenuItemSchema::RECORD_TYPE)?;
        Ok(Self {
            id: record.require_id()?,
            name: record.require_string(MenuItemSchema::NAME)?,
            restaurant: record.require_reference(MenuItemSchema::RESTAURANT)?,
        })
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
