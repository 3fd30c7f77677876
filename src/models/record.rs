use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Opaque, store-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pointer from one record to another record's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "reference")]
    pub record_id: RecordId,
}

impl Reference {
    pub fn new(record_id: RecordId) -> Self {
        Self { record_id }
    }
}

/// Value stored in a record field.
///
/// Serialized untagged: strings stay plain JSON strings, references become
/// `{"reference": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Reference(Reference),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<Reference> for FieldValue {
    fn from(r: Reference) -> Self {
        FieldValue::Reference(r)
    }
}

/// A schema-typed entity as the record store sees it.
///
/// `id` is `None` until the store assigns one on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<RecordId>,
    pub record_type: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            id: None,
            record_type: record_type.into(),
            fields: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns the field as a string, if present and a string.
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the field as a reference, if present and a reference.
    pub fn reference(&self, key: &str) -> Option<&Reference> {
        match self.fields.get(key) {
            Some(FieldValue::Reference(r)) => Some(r),
            _ => None,
        }
    }

    /// Reference pointing at this record. `None` for unsaved records.
    pub fn to_reference(&self) -> Option<Reference> {
        self.id.clone().map(Reference::new)
    }

    pub(crate) fn expect_type(&self, expected: &'static str) -> Result<(), RecordError> {
        if self.record_type != expected {
            return Err(RecordError::WrongType {
                expected,
                found: self.record_type.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_id(&self) -> Result<RecordId, RecordError> {
        self.id.clone().ok_or(RecordError::MissingId)
    }

    pub(crate) fn require_string(&self, key: &'static str) -> Result<String, RecordError> {
        match self.fields.get(key) {
            Some(FieldValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(RecordError::WrongFieldKind(key)),
            None => Err(RecordError::MissingField(key)),
        }
    }

    pub(crate) fn require_reference(&self, key: &'static str) -> Result<Reference, RecordError> {
        match self.fields.get(key) {
            Some(FieldValue::Reference(r)) => Ok(r.clone()),
            Some(_) => Err(RecordError::WrongFieldKind(key)),
            None => Err(RecordError::MissingField(key)),
        }
    }
}

/// Errors decoding a typed entity out of a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected record type '{expected}', found '{found}'")]
    WrongType {
        expected: &'static str,
        found: String,
    },

    #[error("Record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Record field '{0}' has the wrong kind")]
    WrongFieldKind(&'static str),

    #[error("Record has no id; it was never saved")]
    MissingId,
}
