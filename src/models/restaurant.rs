use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Record, RecordError, RecordId, Reference};
use crate::schema::RestaurantSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RecordId,
    pub name: String,
}

impl Restaurant {
    /// Builds the unsaved record for a new restaurant.
    pub fn new_record(name: impl Into<String>) -> Record {
        Record::new(RestaurantSchema::RECORD_TYPE).with_field(RestaurantSchema::NAME, name.into())
    }

    /// Reference used by menu items pointing at this restaurant.
    pub fn reference(&self) -> Reference {
        Reference::new(self.id.clone())
    }
}

impl TryFrom<&Record> for Restaurant {
    type Error = RecordError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        record.expect_type(RestaurantSchema::RECORD_TYPE)?;
        Ok(Self {
            id: record.require_id()?,
            name: record.require_string(RestaurantSchema::NAME)?,
        })
    }
}

impl fmt::Display for Restaurant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
