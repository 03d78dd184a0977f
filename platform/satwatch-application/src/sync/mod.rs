use satwatch_domain::entities::time_series::TimeSeries;
use satwatch_domain::repositories::metric_source::{MetricSource, RefreshScope};
use satwatch_domain::repositories::series_store::SeriesStore;
use satwatch_domain::services::gaps::missing_ranges;
use satwatch_domain::services::merge::{merge, MergeOutcome};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::fetch_window::FetchWindow;
use satwatch_domain::value_objects::record::Record;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Terminal state of one metric's load, fetch, merge and persist cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    /// The cached series already covers the whole window.
    UpToDate,
    Updated { fetched: usize },
    /// Gaps were fetched but came back empty; the cache is reused.
    Unchanged,
    /// Every fetch failed; the cache is reused.
    CachedFallback { error: String },
    NoData,
    Failed { error: String },
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::UpToDate => "up_to_date",
            SyncStatus::Updated { .. } => "updated",
            SyncStatus::Unchanged => "unchanged",
            SyncStatus::CachedFallback { .. } => "cached_fallback",
            SyncStatus::NoData => "no_data",
            SyncStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub name: String,
    pub status: SyncStatus,
    pub series: Option<TimeSeries>,
    pub gaps: Vec<DateRange>,
    pub fetch_errors: Vec<String>,
    pub persist_error: Option<String>,
}

impl MetricResult {
    pub fn is_success(&self) -> bool {
        self.series.is_some()
    }
}

/// Incremental sync of one metric: fetch only the ranges `window` is missing locally,
/// fold them in with last-write-wins and persist the result.
///
/// Sources with [`RefreshScope::Window`] get a single request for the whole window instead,
/// and a non-empty reply replaces the cached records inside the window.
pub fn sync_metric(
    name: &str,
    store: &dyn SeriesStore,
    source: &dyn MetricSource,
    window: &FetchWindow,
) -> MetricResult {
    let _span = info_span!("sync_metric", metric = %name, window = %window).entered();
    let started = Instant::now();

    let existing = store.load(name);
    let gaps = missing_ranges(existing.as_ref(), window);
    let mut result = MetricResult {
        name: name.to_string(),
        status: SyncStatus::UpToDate,
        series: None,
        gaps: gaps.clone(),
        fetch_errors: Vec::new(),
        persist_error: None,
    };

    if gaps.is_empty() {
        info!(records = existing.as_ref().map_or(0, TimeSeries::len), "already up to date");
        result.series = existing;
        record_sync_metrics(name, &result.status, started);
        return result;
    }

    let scope = source.refresh_scope();
    let requests = match scope {
        RefreshScope::Gaps => gaps,
        RefreshScope::Window => {
            info!(gaps = gaps.len(), "refreshing the whole window");
            vec![window.as_range()]
        }
    };

    let mut fetched: Vec<Record> = Vec::new();
    for range in &requests {
        match source.fetch(range) {
            Ok(records) => {
                info!(range = %range, records = records.len(), "fetched range");
                fetched.extend(records);
            }
            Err(err) => {
                warn!(range = %range, kind = err.kind(), error = %err, "fetch failed");
                metrics::counter!("satwatch.sync.fetch_errors", "metric" => name.to_string(), "kind" => err.kind())
                    .increment(1);
                result.fetch_errors.push(format!("{range}: {err}"));
            }
        }
    }

    if result.fetch_errors.len() == requests.len() {
        let error = result.fetch_errors.last().cloned().unwrap_or_default();
        match existing {
            Some(series) if !series.is_empty() => {
                warn!(records = series.len(), "all fetches failed, using cached series");
                result.status = SyncStatus::CachedFallback { error };
                result.series = Some(series);
            }
            _ => {
                result.status = SyncStatus::Failed { error };
            }
        }
        record_sync_metrics(name, &result.status, started);
        return result;
    }

    let existing = match existing {
        Some(series) if scope == RefreshScope::Window && !fetched.is_empty() => {
            Some(outside_window(series, window))
        }
        other => other,
    };

    match merge(name, existing, fetched) {
        MergeOutcome::Unchanged(series) => {
            info!(records = series.len(), "no new records, cache reused");
            result.status = SyncStatus::Unchanged;
            result.series = Some(series);
        }
        MergeOutcome::Updated { series, fetched } => {
            result.status = SyncStatus::Updated { fetched };
            if let Err(err) = store.save(&series) {
                warn!(error = %err, "failed to persist merged series");
                metrics::counter!("satwatch.sync.persist_errors", "metric" => name.to_string())
                    .increment(1);
                result.persist_error = Some(err);
            } else {
                info!(fetched, records = series.len(), "persisted merged series");
            }
            result.series = Some(series);
        }
        MergeOutcome::NoData => {
            warn!("no data available");
            result.status = SyncStatus::NoData;
        }
    }

    record_sync_metrics(name, &result.status, started);
    result
}

fn outside_window(series: TimeSeries, window: &FetchWindow) -> TimeSeries {
    let name = series.name().to_string();
    let kept = series
        .into_records()
        .into_iter()
        .filter(|record| !window.contains(record.date()));
    TimeSeries::from_records(&name, kept)
}

fn record_sync_metrics(name: &str, status: &SyncStatus, started: Instant) {
    metrics::counter!("satwatch.sync.runs", "metric" => name.to_string(), "status" => status.label())
        .increment(1);
    metrics::histogram!("satwatch.sync.duration_ms", "metric" => name.to_string())
        .record(started.elapsed().as_millis() as f64);
}

/// Missing ranges per metric against the local store, without fetching anything.
pub fn gap_plan(
    store: &dyn SeriesStore,
    names: &[String],
    window: &FetchWindow,
) -> Vec<(String, Vec<DateRange>)> {
    names
        .iter()
        .map(|name| {
            let existing = store.load(name);
            (name.clone(), missing_ranges(existing.as_ref(), window))
        })
        .collect()
}
