use crate::models::{FieldValue, Record};

/// Filter condition of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record of the queried type.
    All,
    /// Matches records whose `field` equals `value`.
    FieldEquals { field: String, value: FieldValue },
}

impl Predicate {
    pub fn field_equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::FieldEquals { field, value } => record.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

/// A typed query: record type, predicate and optional sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
    pub sort: Option<SortDescriptor>,
}

impl Query {
    /// Every record of `record_type`, unsorted.
    pub fn all(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            predicate: Predicate::All,
            sort: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn sorted_by(mut self, key: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(SortDescriptor {
            key: key.into(),
            ascending,
        });
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.record_type == self.record_type && self.predicate.matches(record)
    }

    /// Filters and sorts `records` the way a backend answers this query.
    ///
    /// Sorting compares the sort key's string value; records without one sort
    /// as the empty string. The sort is stable.
    pub fn apply(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut matched: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| {
                let ord = a
                    .string(&sort.key)
                    .unwrap_or("")
                    .cmp(b.string(&sort.key).unwrap_or(""));
                if sort.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        matched
    }
}
