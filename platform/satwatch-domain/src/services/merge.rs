use crate::entities::time_series::TimeSeries;
use crate::value_objects::record::Record;

/// Result of folding freshly fetched records into a cached series.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Nothing was fetched; the cached series is returned as-is.
    Unchanged(TimeSeries),
    Updated { series: TimeSeries, fetched: usize },
    /// Neither a cached series nor fetched records exist.
    NoData,
}

impl MergeOutcome {
    pub fn series(&self) -> Option<&TimeSeries> {
        match self {
            MergeOutcome::Unchanged(series) | MergeOutcome::Updated { series, .. } => Some(series),
            MergeOutcome::NoData => None,
        }
    }

    pub fn into_series(self) -> Option<TimeSeries> {
        match self {
            MergeOutcome::Unchanged(series) | MergeOutcome::Updated { series, .. } => Some(series),
            MergeOutcome::NoData => None,
        }
    }
}

/// Concatenates `existing` and `new_records`, keeps the last record per timestamp
/// (fetched data overrides cached data) and re-sorts ascending.
pub fn merge(name: &str, existing: Option<TimeSeries>, new_records: Vec<Record>) -> MergeOutcome {
    if new_records.is_empty() {
        return match existing {
            Some(series) if !series.is_empty() => MergeOutcome::Unchanged(series),
            _ => MergeOutcome::NoData,
        };
    }

    let fetched = new_records.len();
    let combined = existing
        .map(TimeSeries::into_records)
        .unwrap_or_default()
        .into_iter()
        .chain(new_records);
    MergeOutcome::Updated {
        series: TimeSeries::from_records(name, combined),
        fetched,
    }
}

#[cfg(test)]
mod tests {
    use super::{merge, MergeOutcome};
    use crate::entities::time_series::TimeSeries;
    use crate::value_objects::record::Record;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
    }

    fn existing() -> TimeSeries {
        TimeSeries::from_records(
            "open_interest",
            vec![
                Record::daily(d(1), "Open Interest", 10.0),
                Record::daily(d(2), "Open Interest", 20.0),
            ],
        )
    }

    #[test]
    fn empty_fetch_returns_existing_unchanged() {
        let cached = existing();
        let outcome = merge("open_interest", Some(cached.clone()), Vec::new());
        assert_eq!(outcome, MergeOutcome::Unchanged(cached));
    }

    #[test]
    fn nothing_anywhere_is_no_data() {
        assert_eq!(merge("x", None, Vec::new()), MergeOutcome::NoData);
        assert_eq!(
            merge("x", Some(TimeSeries::empty("x")), Vec::new()),
            MergeOutcome::NoData
        );
    }

    #[test]
    fn fetched_value_wins_on_shared_timestamp() {
        let outcome = merge(
            "open_interest",
            Some(existing()),
            vec![
                Record::daily(d(3), "Open Interest", 30.0),
                Record::daily(d(2), "Open Interest", 25.0),
            ],
        );
        let MergeOutcome::Updated { series, fetched } = outcome else {
            panic!("expected update");
        };
        assert_eq!(fetched, 2);
        assert_eq!(series.len(), 3);
        assert!(series.is_strictly_ascending());
        assert_eq!(series.records()[1].get("Open Interest"), Some(25.0));
        assert_eq!(series.name(), "open_interest");
    }

    #[test]
    fn later_fetched_duplicate_wins_over_earlier_fetched_duplicate() {
        let outcome = merge(
            "btcusd",
            None,
            vec![
                Record::daily(d(4), "BTCUSD Price", 1.0),
                Record::daily(d(4), "BTCUSD Price", 2.0),
            ],
        );
        let series = outcome.into_series().expect("series");
        assert_eq!(series.len(), 1);
        assert_eq!(series.records()[0].get("BTCUSD Price"), Some(2.0));
    }
}
