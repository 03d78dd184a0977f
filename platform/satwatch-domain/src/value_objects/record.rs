use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

/// One timestamped observation with one or more named numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    pub values: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn daily(date: NaiveDate, field: &str, value: f64) -> Self {
        Self::new(date.and_time(NaiveTime::MIN)).with(field, value)
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn insert(&mut self, field: &str, value: f64) {
        self.values.insert(field.to_string(), value);
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
