use satwatch_domain::repositories::calendar::TradingCalendar;
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource, RefreshScope};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use std::thread;
use std::time::Duration;

/// Walks a range one trading day at a time against a single-day upstream.
///
/// Closed days are never requested. A failed day is logged and skipped; the stepper only
/// fails when every attempted day failed, returning the last error.
pub struct DailyStepper {
    inner: Box<dyn MetricSource>,
    calendar: Box<dyn TradingCalendar>,
    pacing: Duration,
}

impl DailyStepper {
    pub fn new(
        inner: Box<dyn MetricSource>,
        calendar: Box<dyn TradingCalendar>,
        pacing: Duration,
    ) -> Self {
        Self {
            inner,
            calendar,
            pacing,
        }
    }
}

impl MetricSource for DailyStepper {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let mut records = Vec::new();
        let mut attempted = 0usize;
        let mut last_error = None;
        let mut failures = 0usize;

        for day in range.days() {
            if !self.calendar.is_trading_day(day) {
                tracing::trace!(%day, "skipping closed day");
                continue;
            }
            if attempted > 0 && !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
            attempted += 1;

            match self.inner.fetch(&DateRange::single(day)) {
                Ok(mut day_records) => records.append(&mut day_records),
                Err(err) => {
                    tracing::warn!(%day, error = %err, "daily fetch failed, skipping day");
                    failures += 1;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if failures == attempted => Err(err),
            _ => {
                records.sort_by_key(|record| record.timestamp);
                Ok(records)
            }
        }
    }

    fn refresh_scope(&self) -> RefreshScope {
        self.inner.refresh_scope()
    }
}
