use chrono::NaiveDate;
use satwatch_application::collector::{Collector, CollectorSettings, MetricJob};
use satwatch_application::sync::SyncStatus;
use satwatch_domain::entities::time_series::TimeSeries;
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
use satwatch_domain::repositories::series_store::SeriesStore;
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::fetch_window::FetchWindow;
use satwatch_domain::value_objects::record::Record;
use satwatch_infrastructure::persistence::csv_store::CsvSeriesStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
}

fn unique_tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("satwatch_{name}_{}_{nanos}", std::process::id()))
}

#[derive(Default, Clone)]
struct SharedStore {
    series: Arc<Mutex<BTreeMap<String, TimeSeries>>>,
}

impl SeriesStore for SharedStore {
    fn load(&self, name: &str) -> Option<TimeSeries> {
        self.series.lock().ok()?.get(name).cloned()
    }

    fn save(&self, series: &TimeSeries) -> Result<(), String> {
        self.series
            .lock()
            .map_err(|err| format!("store lock poisoned: {err}"))?
            .insert(series.name().to_string(), series.clone());
        Ok(())
    }
}

struct ConstantSource {
    column: &'static str,
    value: f64,
}

impl MetricSource for ConstantSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        Ok(range
            .days()
            .map(|day| Record::daily(day, self.column, self.value))
            .collect())
    }
}

struct BrokenSource;

impl MetricSource for BrokenSource {
    fn fetch(&self, _range: &DateRange) -> Result<Vec<Record>, FetchError> {
        Err(FetchError::Transport("connection reset".to_string()))
    }
}

fn constant(column: &'static str, value: f64) -> Box<dyn MetricSource> {
    Box::new(ConstantSource { column, value })
}

#[test]
fn two_failing_metrics_do_not_stop_the_other_three() {
    let window = FetchWindow::new(d(1), d(7)).expect("window");
    let jobs = vec![
        MetricJob::new("btcusd", constant("BTCUSD Price", 42_000.0)),
        MetricJob::new("dxy", Box::new(BrokenSource)),
        MetricJob::new("hash_rate", constant("Hash Rate", 600.0)),
        MetricJob::new("fear_greed", Box::new(BrokenSource)),
        MetricJob::new("open_interest", constant("Open Interest", 80_000.0)),
    ];
    let store = SharedStore::default();
    let collector = Collector::new(CollectorSettings { window }, Box::new(store.clone()), jobs);

    let report = collector.collect_all();

    assert_eq!(report.total_count(), 5);
    assert_eq!(report.success_count(), 3);
    assert!(report.is_usable());
    assert_eq!(report.mapping().len(), 5);
    assert_eq!(report.failed(), vec!["dxy", "fear_greed"]);
    let names: Vec<&str> = report.mapping().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["btcusd", "dxy", "hash_rate", "fear_greed", "open_interest"]);
    assert!(matches!(
        report.summaries()[1].status,
        SyncStatus::Failed { .. }
    ));
    assert_eq!(store.load("btcusd").map(|s| s.len()), Some(7));
    assert!(store.load("dxy").is_none());
}

#[test]
fn every_metric_failing_is_not_usable() {
    let window = FetchWindow::new(d(1), d(3)).expect("window");
    let jobs = vec![
        MetricJob::new("btcusd", Box::new(BrokenSource)),
        MetricJob::new("dxy", Box::new(BrokenSource)),
    ];
    let collector = Collector::new(
        CollectorSettings { window },
        Box::new(SharedStore::default()),
        jobs,
    );
    let report = collector.collect_all();
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.total_count(), 2);
    assert!(!report.is_usable());
}

#[test]
fn second_run_against_csv_store_is_incremental() {
    let dir = unique_tmp_dir("collector");
    let first = FetchWindow::new(d(1), d(5)).expect("window");
    let collector = Collector::new(
        CollectorSettings { window: first },
        Box::new(CsvSeriesStore::new(&dir)),
        vec![MetricJob::new("hash_rate", constant("Hash Rate", 1.0))],
    );
    let report = collector.collect_all();
    assert_eq!(report.summaries()[0].status, SyncStatus::Updated { fetched: 5 });

    let second = FetchWindow::new(d(1), d(7)).expect("window");
    let collector = Collector::new(
        CollectorSettings { window: second },
        Box::new(CsvSeriesStore::new(&dir)),
        vec![MetricJob::new("hash_rate", constant("Hash Rate", 2.0))],
    );
    let report = collector.collect_all();
    assert_eq!(report.summaries()[0].status, SyncStatus::Updated { fetched: 2 });

    let series = report.series("hash_rate").expect("series");
    let column = series.daily_column("Hash Rate");
    assert_eq!(column.len(), 7);
    assert_eq!(column.get(&d(1)), Some(&1.0));
    assert_eq!(column.get(&d(7)), Some(&2.0));

    let _ = std::fs::remove_dir_all(&dir);
}
