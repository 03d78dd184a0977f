use chrono::{DateTime, NaiveDate, NaiveDateTime};
use satwatch_domain::entities::time_series::TimeSeries;
use satwatch_domain::repositories::series_store::SeriesStore;
use satwatch_domain::value_objects::record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const INDEX_COLUMN: &str = "timestamp";
/// Index column names accepted on load, in order of preference.
const INDEX_ALIASES: &[&str] = &["timestamp", "Date", "date"];
const DROPPED_COLUMNS: &[&str] = &["timestamp", "Date", "date", "index", "Unnamed: 0"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One `<name>.csv` per metric under `data_dir`.
#[derive(Debug, Clone)]
pub struct CsvSeriesStore {
    data_dir: PathBuf,
}

impl CsvSeriesStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.csv"))
    }
}

fn record_store_metrics<T>(op: &'static str, start: Instant, result: &Result<T, String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("satwatch.store.calls_total", "op" => op, "result" => result_label)
        .increment(1);
    metrics::histogram!("satwatch.store.op_ms", "op" => op, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

impl SeriesStore for CsvSeriesStore {
    fn load(&self, name: &str) -> Option<TimeSeries> {
        let path = self.path_for(name);
        if !path.exists() {
            return None;
        }
        let start = Instant::now();
        let result = read_series(&path, name);
        record_store_metrics("load", start, &result);
        match result {
            Ok(series) => Some(series),
            Err(err) => {
                tracing::warn!(metric = name, error = %err, "ignoring unreadable series file");
                None
            }
        }
    }

    fn save(&self, series: &TimeSeries) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(&self.data_dir)
            .map_err(|err| format!("failed to create dir {}: {}", self.data_dir.display(), err))
            .and_then(|()| write_series_atomic(&self.path_for(series.name()), series));
        record_store_metrics("save", start, &result);
        result
    }
}

pub fn read_series(path: &Path, name: &str) -> Result<TimeSeries, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open series csv {}: {}", path.display(), err))?;
    let headers = rdr
        .headers()
        .map_err(|err| format!("failed to read header of {}: {}", path.display(), err))?
        .clone();

    let index = INDEX_ALIASES
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == *alias))
        .ok_or_else(|| format!("{}: no timestamp/Date index column", path.display()))?;
    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !DROPPED_COLUMNS.contains(h) && !h.trim().is_empty())
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row.map_err(|err| format!("{}: malformed row {}: {}", path.display(), line + 2, err))?;
        let raw_ts = row.get(index).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
            format!("{}: row {}: unparsable timestamp {raw_ts:?}", path.display(), line + 2)
        })?;

        let mut record = Record::new(timestamp);
        for (col, column) in &value_columns {
            let cell = row.get(*col).unwrap_or_default().trim();
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| {
                format!(
                    "{}: row {}: column {column:?} is not numeric: {cell:?}",
                    path.display(),
                    line + 2
                )
            })?;
            if value.is_finite() {
                record.insert(column, value);
            }
        }
        // A row without values must not count as a cached day.
        if record.is_empty() {
            tracing::debug!(path = %path.display(), row = line + 2, "skipping row without values");
            continue;
        }
        records.push(record);
    }

    Ok(TimeSeries::from_records(name, records))
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(chrono::NaiveTime::MIN));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z")
        .ok()
        .map(|ts| ts.naive_utc())
}

/// Writes to `<path>.tmp` and renames over `path`, so a failed write never clobbers the
/// previous file.
pub fn write_series_atomic(path: &Path, series: &TimeSeries) -> Result<(), String> {
    let tmp = path.with_extension("csv.tmp");
    let result = write_series(&tmp, series).and_then(|()| {
        fs::rename(&tmp, path).map_err(|err| {
            format!("failed to replace {} with {}: {}", path.display(), tmp.display(), err)
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_series(path: &Path, series: &TimeSeries) -> Result<(), String> {
    let columns = series.columns();
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create series csv {}: {}", path.display(), err))?;

    let mut header = Vec::with_capacity(columns.len() + 1);
    header.push(INDEX_COLUMN.to_string());
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write series csv header: {}", err))?;

    for record in series.records() {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(record.timestamp.format(TIMESTAMP_FORMAT).to_string());
        for column in &columns {
            row.push(record.get(column).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&row)
            .map_err(|err| format!("failed to write series row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush series csv: {}", err))
}

#[cfg(test)]
mod tests {
    use super::{parse_timestamp, CsvSeriesStore};
    use crate::test_support::unique_tmp_dir;
    use chrono::NaiveDate;
    use satwatch_domain::entities::time_series::TimeSeries;
    use satwatch_domain::repositories::series_store::SeriesStore;
    use satwatch_domain::services::gaps::missing_ranges;
    use satwatch_domain::value_objects::date_range::DateRange;
    use satwatch_domain::value_objects::fetch_window::FetchWindow;
    use satwatch_domain::value_objects::record::Record;
    use std::fs;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
    }

    #[test]
    fn save_then_load_preserves_records_and_sparse_columns() {
        let dir = unique_tmp_dir("csv_roundtrip");
        let store = CsvSeriesStore::new(&dir);
        let series = TimeSeries::from_records(
            "etf",
            vec![
                Record::daily(d(2), "GBTC Price", 41.5).with("GBTC Volume", 1000.0),
                Record::daily(d(3), "GBTC Price", 42.25),
            ],
        );
        store.save(&series).expect("save");

        let raw = fs::read_to_string(store.path_for("etf")).expect("read");
        assert!(raw.starts_with("timestamp,GBTC Price,GBTC Volume\n"), "{raw}");
        assert!(raw.contains("2024-01-03 00:00:00,42.25,\n"), "{raw}");
        assert!(!dir.join("etf.csv.tmp").exists());

        let loaded = store.load("etf").expect("loaded");
        assert_eq!(loaded, series);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn legacy_date_index_and_extra_date_column_are_normalised() {
        let dir = unique_tmp_dir("csv_legacy");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join("dxy.csv"),
            "Date,DXY Price\n2024-01-02,101.5\n2024-01-03,102\n",
        )
        .expect("write");
        fs::write(
            dir.join("google_trends.csv"),
            "timestamp,bitcoin Trend,date\n2024-01-01 00:00:00,55,2024-01-01\n",
        )
        .expect("write");
        let store = CsvSeriesStore::new(&dir);

        let dxy = store.load("dxy").expect("dxy");
        assert_eq!(dxy.len(), 2);
        assert_eq!(dxy.daily_column("DXY Price").get(&d(3)), Some(&102.0));

        let trends = store.load("google_trends").expect("trends");
        assert_eq!(trends.columns(), vec!["bitcoin Trend".to_string()]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rows_without_values_stay_missing() {
        let dir = unique_tmp_dir("csv_blank_rows");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(
            dir.join("etf.csv"),
            "timestamp,GBTC Price,IBIT Price
2024-01-01 00:00:00,40,30
2024-01-02 00:00:00,,
2024-01-03 00:00:00,,31
",
        )
        .expect("write");
        let store = CsvSeriesStore::new(&dir);

        let loaded = store.load("etf").expect("etf");
        assert_eq!(loaded.len(), 2);
        let window = FetchWindow::new(d(1), d(3)).expect("window");
        assert_eq!(
            missing_ranges(Some(&loaded), &window),
            vec![DateRange::single(d(2))]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_or_missing_files_load_as_absent() {
        let dir = unique_tmp_dir("csv_malformed");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(dir.join("bad.csv"), "timestamp,Value\nyesterday,1\n").expect("write");
        fs::write(dir.join("noindex.csv"), "when,Value\n2024-01-01,1\n").expect("write");
        fs::write(dir.join("text.csv"), "timestamp,Value\n2024-01-01,abc\n").expect("write");
        let store = CsvSeriesStore::new(&dir);

        assert!(store.load("bad").is_none());
        assert!(store.load("noindex").is_none());
        assert!(store.load("text").is_none());
        assert!(store.load("missing").is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn accepts_common_timestamp_layouts() {
        let midnight = d(5).and_hms_opt(0, 0, 0).expect("ts");
        assert_eq!(parse_timestamp("2024-01-05"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-05 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-05 00:00:00+00:00"), Some(midnight));
        assert_eq!(parse_timestamp("05/01/2024"), None);
    }
}
