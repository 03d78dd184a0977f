use super::{clip, unix_seconds, utc_from_seconds};
use crate::http::HttpClient;
use chrono::{Days, NaiveDate};
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Yahoo Finance v8 chart endpoint, daily interval. Bars are dated in exchange-local time.
#[derive(Debug, Clone)]
pub struct YahooChart {
    http: HttpClient,
    base_url: String,
}

impl YahooChart {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn daily_bars(&self, symbol: &str, range: &DateRange) -> Result<Vec<DailyBar>, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period2 = range
            .end()
            .checked_add_days(Days::new(1))
            .unwrap_or(range.end());
        let envelope: ChartEnvelope = self.http.get_json(
            "yahoo",
            &url,
            &[
                ("period1", unix_seconds(range.start()).to_string()),
                ("period2", unix_seconds(period2).to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ],
        )?;

        if let Some(err) = envelope.chart.error {
            return Err(FetchError::Unavailable(format!(
                "yahoo {symbol}: {} {}",
                err.code,
                err.description.unwrap_or_default()
            )));
        }
        let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let quote = result.indicators.quote.into_iter().next();
        let (closes, volumes) = quote
            .map(|q| (q.close, q.volume))
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            let Some(local) = utc_from_seconds(ts + result.meta.gmtoffset) else {
                continue;
            };
            let date = local.date();
            if !range.contains(date) {
                continue;
            }
            bars.push(DailyBar {
                date,
                close: closes.get(i).copied().flatten(),
                volume: volumes.get(i).copied().flatten(),
            });
        }
        Ok(bars)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YahooField {
    Close(String),
    Volume(String),
}

pub struct YahooSeriesSource {
    chart: YahooChart,
    symbol: String,
    field: YahooField,
}

impl YahooSeriesSource {
    pub fn new(chart: YahooChart, symbol: &str, field: YahooField) -> Self {
        Self {
            chart,
            symbol: symbol.to_string(),
            field,
        }
    }
}

impl MetricSource for YahooSeriesSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let bars = self.chart.daily_bars(&self.symbol, range)?;
        let records = bars
            .into_iter()
            .filter_map(|bar| match &self.field {
                YahooField::Close(column) => bar.close.map(|v| Record::daily(bar.date, column, v)),
                YahooField::Volume(column) => bar.volume.map(|v| Record::daily(bar.date, column, v)),
            })
            .collect();
        Ok(clip(records, range))
    }
}

/// Price, volume and dollar flow (price x volume) per fund, one record per date.
pub struct YahooEtfSource {
    chart: YahooChart,
    symbols: Vec<String>,
}

impl YahooEtfSource {
    pub fn new(chart: YahooChart, symbols: Vec<String>) -> Self {
        Self { chart, symbols }
    }
}

impl MetricSource for YahooEtfSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let mut by_date: BTreeMap<NaiveDate, Record> = BTreeMap::new();
        for symbol in &self.symbols {
            for bar in self.chart.daily_bars(symbol, range)? {
                let (Some(price), Some(volume)) = (bar.close, bar.volume) else {
                    continue;
                };
                let record = by_date
                    .entry(bar.date)
                    .or_insert_with(|| Record::new(bar.date.and_time(chrono::NaiveTime::MIN)));
                record.insert(&format!("{symbol} Price"), price);
                record.insert(&format!("{symbol} Volume"), volume);
                record.insert(&format!("{symbol} Flow"), price * volume);
            }
        }
        Ok(clip(by_date.into_values().collect(), range))
    }
}

#[cfg(test)]
mod tests {
    use super::{YahooChart, YahooEtfSource, YahooField, YahooSeriesSource};
    use crate::http::{HttpClient, HttpSettings};
    use crate::test_support::{json_ok, try_spawn_server};
    use chrono::NaiveDate;
    use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
    use satwatch_domain::value_objects::date_range::DateRange;

    fn client() -> HttpClient {
        HttpClient::new(&HttpSettings {
            retries: 0,
            ..HttpSettings::default()
        })
        .expect("client")
    }

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, start).expect("date"),
            NaiveDate::from_ymd_opt(2024, 1, end).expect("date"),
        )
        .expect("range")
    }

    // 2024-01-01, 2024-01-02, 2024-01-03 at 00:00 UTC, the last with a null close.
    const BTC_BODY: &str = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704067200,1704153600,1704240000],"indicators":{"quote":[{"close":[42000.5,43000.0,null],"volume":[1000,2000,3000]}]}}],"error":null}}"#;

    #[test]
    fn close_source_skips_null_closes_and_queries_inclusive_range() {
        let Some(server) = try_spawn_server(vec![json_ok(BTC_BODY)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = YahooSeriesSource::new(
            YahooChart::new(client(), &server.base_url),
            "BTC-USD",
            YahooField::Close("BTCUSD Price".to_string()),
        );
        let records = source.fetch(&range(1, 3)).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("BTCUSD Price"), Some(42000.5));

        let request = &server.requests()[0];
        assert!(request.starts_with("GET /v8/finance/chart/BTC-USD?"), "{request}");
        assert!(request.contains("period1=1704067200"), "{request}");
        assert!(request.contains("period2=1704326400"), "{request}");
    }

    #[test]
    fn volume_source_reads_volume_column() {
        let Some(server) = try_spawn_server(vec![json_ok(BTC_BODY)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = YahooSeriesSource::new(
            YahooChart::new(client(), &server.base_url),
            "BTC-USD",
            YahooField::Volume("Trading Volume".to_string()),
        );
        let records = source.fetch(&range(1, 2)).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Trading Volume"), Some(2000.0));
    }

    #[test]
    fn etf_source_merges_symbols_per_date() {
        let gbtc = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704153600],"indicators":{"quote":[{"close":[40.0],"volume":[10]}]}}],"error":null}}"#;
        let bito = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704153600],"indicators":{"quote":[{"close":[20.0],"volume":[5]}]}}],"error":null}}"#;
        let Some(server) = try_spawn_server(vec![json_ok(gbtc), json_ok(bito)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = YahooEtfSource::new(
            YahooChart::new(client(), &server.base_url),
            vec!["GBTC".to_string(), "BITO".to_string()],
        );
        let records = source.fetch(&range(2, 2)).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("GBTC Flow"), Some(400.0));
        assert_eq!(records[0].get("BITO Price"), Some(20.0));
    }

    #[test]
    fn chart_error_is_reported_as_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let Some(server) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = YahooSeriesSource::new(
            YahooChart::new(client(), &server.base_url),
            "NOPE",
            YahooField::Close("Nope".to_string()),
        );
        let err = source.fetch(&range(1, 1)).expect_err("unavailable");
        assert!(matches!(err, FetchError::Unavailable(_)), "{err}");
    }
}
