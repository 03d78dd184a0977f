use crate::value_objects::fetch_window::FetchWindow;
use crate::value_objects::record::Record;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

/// Named metric keyed by timestamp. Timestamps are unique and strictly ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    records: Vec<Record>,
}

impl TimeSeries {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
        }
    }

    /// Builds a series from records in arrival order. A later record replaces an
    /// earlier one carrying the same timestamp.
    pub fn from_records(name: &str, records: impl IntoIterator<Item = Record>) -> Self {
        let mut by_ts: BTreeMap<NaiveDateTime, Record> = BTreeMap::new();
        for record in records {
            by_ts.insert(record.timestamp, record);
        }
        Self {
            name: name.to_string(),
            records: by_ts.into_values().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(Record::date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(Record::date)
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(Record::date).collect()
    }

    /// Sorted union of every field name present in the series.
    pub fn columns(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.records.iter().flat_map(|r| r.values.keys()).collect();
        set.into_iter().cloned().collect()
    }

    pub fn column(&self, field: &str) -> Vec<(NaiveDateTime, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.get(field).map(|v| (r.timestamp, v)))
            .collect()
    }

    /// One value per calendar date; the last observation of a day wins.
    pub fn daily_column(&self, field: &str) -> BTreeMap<NaiveDate, f64> {
        self.records
            .iter()
            .filter_map(|r| r.get(field).map(|v| (r.date(), v)))
            .collect()
    }

    pub fn within(&self, window: &FetchWindow) -> TimeSeries {
        Self {
            name: self.name.clone(),
            records: self
                .records
                .iter()
                .filter(|r| window.contains(r.date()))
                .cloned()
                .collect(),
        }
    }

    pub fn is_strictly_ascending(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp)
    }
}
