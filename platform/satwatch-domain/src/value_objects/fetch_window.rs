use crate::value_objects::date_range::DateRange;
use crate::value_objects::lookback::Lookback;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Global collection period for one orchestration run, `[now - lookback, now]` at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    range: DateRange,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        Ok(Self {
            range: DateRange::new(start, end)?,
        })
    }

    pub fn trailing(now: NaiveDateTime, lookback: Lookback) -> Result<Self, String> {
        let end = now.date();
        let start = lookback.start_from(end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }

    pub fn start_midnight(&self) -> NaiveDateTime {
        self.range.start().and_time(chrono::NaiveTime::MIN)
    }

    pub fn end_midnight(&self) -> NaiveDateTime {
        self.range.end().and_time(chrono::NaiveTime::MIN)
    }

    pub fn as_range(&self) -> DateRange {
        self.range
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.range.contains(day)
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start(), self.end())
    }
}
