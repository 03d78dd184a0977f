use crate::config::Config;
use crate::sync::{sync_metric, MetricResult, SyncStatus};
use chrono::NaiveDateTime;
use satwatch_domain::entities::time_series::TimeSeries;
use satwatch_domain::repositories::metric_source::MetricSource;
use satwatch_domain::repositories::series_store::SeriesStore;
use satwatch_domain::value_objects::fetch_window::FetchWindow;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    pub window: FetchWindow,
}

impl CollectorSettings {
    pub fn from_config(config: &Config, now: NaiveDateTime) -> Result<Self, String> {
        let lookback = config.lookback()?;
        let window = FetchWindow::trailing(now, lookback)?;
        Ok(Self { window })
    }
}

pub struct MetricJob {
    pub name: String,
    pub source: Box<dyn MetricSource>,
}

impl MetricJob {
    pub fn new(name: impl Into<String>, source: Box<dyn MetricSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub name: String,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub records: usize,
    pub fetch_errors: Vec<String>,
    pub persist_error: Option<String>,
}

/// Outcome of one orchestration run, in configured metric order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub window: FetchWindow,
    series: Vec<(String, Option<TimeSeries>)>,
    summaries: Vec<MetricSummary>,
}

impl CollectionReport {
    pub fn from_results(window: FetchWindow, results: Vec<MetricResult>) -> Self {
        let mut series = Vec::with_capacity(results.len());
        let mut summaries = Vec::with_capacity(results.len());
        for result in results {
            summaries.push(MetricSummary {
                name: result.name.clone(),
                status: result.status,
                records: result.series.as_ref().map_or(0, TimeSeries::len),
                fetch_errors: result.fetch_errors,
                persist_error: result.persist_error,
            });
            series.push((result.name, result.series));
        }
        Self {
            window,
            series,
            summaries,
        }
    }

    /// Cached series only, no network. Absent or unreadable files map to `None`.
    pub fn from_store(window: FetchWindow, store: &dyn SeriesStore, names: &[String]) -> Self {
        let results = names
            .iter()
            .map(|name| {
                let series = store.load(name).filter(|s| !s.is_empty());
                let status = if series.is_some() {
                    SyncStatus::Unchanged
                } else {
                    SyncStatus::NoData
                };
                MetricResult {
                    name: name.clone(),
                    status,
                    series,
                    gaps: Vec::new(),
                    fetch_errors: Vec::new(),
                    persist_error: None,
                }
            })
            .collect();
        Self::from_results(window, results)
    }

    /// Metric name to collected series; failed metrics map to `None`.
    pub fn mapping(&self) -> &[(String, Option<TimeSeries>)] {
        &self.series
    }

    pub fn series(&self, name: &str) -> Option<&TimeSeries> {
        self.series
            .iter()
            .find(|(metric, _)| metric == name)
            .and_then(|(_, series)| series.as_ref())
    }

    pub fn summaries(&self) -> &[MetricSummary] {
        &self.summaries
    }

    pub fn success_count(&self) -> usize {
        self.series.iter().filter(|(_, s)| s.is_some()).count()
    }

    pub fn total_count(&self) -> usize {
        self.series.len()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter(|(_, s)| s.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// A run is usable as long as one metric produced a series.
    pub fn is_usable(&self) -> bool {
        self.success_count() >= 1
    }
}

pub struct Collector {
    settings: CollectorSettings,
    store: Box<dyn SeriesStore>,
    jobs: Vec<MetricJob>,
}

impl Collector {
    pub fn new(settings: CollectorSettings, store: Box<dyn SeriesStore>, jobs: Vec<MetricJob>) -> Self {
        Self {
            settings,
            store,
            jobs,
        }
    }

    pub fn window(&self) -> &FetchWindow {
        &self.settings.window
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.name.clone()).collect()
    }

    pub fn store(&self) -> &dyn SeriesStore {
        self.store.as_ref()
    }

    /// Runs every job's sync cycle sequentially. A failing metric never stops the others.
    pub fn collect_all(&self) -> CollectionReport {
        let window = self.settings.window;
        let _span = info_span!("collect_all", window = %window, metrics = self.jobs.len()).entered();
        let started = Instant::now();
        info!(start = %window.start(), end = %window.end(), "collection started");

        let mut results = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let result = sync_metric(&job.name, self.store.as_ref(), job.source.as_ref(), &window);
            if result.is_success() {
                info!(metric = %job.name, status = result.status.label(), "✓ {}", job.name);
            } else {
                warn!(metric = %job.name, status = result.status.label(), "✗ {}", job.name);
            }
            results.push(result);
        }

        let report = CollectionReport::from_results(window, results);
        let success = report.success_count();
        let total = report.total_count();
        metrics::gauge!("satwatch.collect.success_count").set(success as f64);
        metrics::histogram!("satwatch.collect.duration_ms")
            .record(started.elapsed().as_millis() as f64);
        if report.is_usable() {
            info!(success, total, "collection finished: {success}/{total} succeeded");
        } else {
            error!(success, total, "collection finished: {success}/{total} succeeded");
        }
        report
    }
}
