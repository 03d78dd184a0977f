use crate::entities::time_series::TimeSeries;
use crate::value_objects::date_range::DateRange;
use crate::value_objects::fetch_window::FetchWindow;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Minimal, ascending, non-overlapping set of date ranges inside `window` that
/// `existing` does not cover. Absent or empty input yields the whole window.
pub fn missing_ranges(existing: Option<&TimeSeries>, window: &FetchWindow) -> Vec<DateRange> {
    let present = match existing {
        Some(series) if !series.is_empty() => series.dates(),
        _ => return vec![window.as_range()],
    };

    let missing = window
        .as_range()
        .days()
        .filter(|day| !present.contains(day));
    coalesce_dates(missing)
}

/// Groups ascending dates into maximal runs of consecutive days.
pub fn coalesce_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<DateRange> {
    let sorted: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };

    let mut run_start = first;
    let mut prev = first;
    for day in iter {
        if (day - prev).num_days() > 1 {
            ranges.push(DateRange::new(run_start, prev).unwrap_or(DateRange::single(prev)));
            run_start = day;
        }
        prev = day;
    }
    ranges.push(DateRange::new(run_start, prev).unwrap_or(DateRange::single(prev)));
    ranges
}
