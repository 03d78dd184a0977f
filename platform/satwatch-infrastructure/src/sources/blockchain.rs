use super::{clip, utc_from_seconds};
use crate::http::HttpClient;
use chrono::NaiveDate;
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use serde::Deserialize;

pub const LARGE_HOLDERS_COLUMN: &str = "Total Holdings";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    values: Vec<ChartPoint>,
}

#[derive(Debug, Deserialize)]
struct ChartPoint {
    x: i64,
    y: f64,
}

/// blockchain.info chart series (`n-unique-addresses`, `hash-rate`, ...).
pub struct BlockchainChartSource {
    http: HttpClient,
    base_url: String,
    chart: String,
    column: String,
}

impl BlockchainChartSource {
    pub fn new(http: HttpClient, base_url: &str, chart: &str, column: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            chart: chart.to_string(),
            column: column.to_string(),
        }
    }
}

impl MetricSource for BlockchainChartSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let url = format!("{}/charts/{}", self.base_url, self.chart);
        let response: ChartResponse = self.http.get_json(
            "blockchain",
            &url,
            &[
                ("start", range.start().format("%Y-%m-%d").to_string()),
                ("timespan", format!("{}days", range.len_days())),
                ("format", "json".to_string()),
                ("sampled", "false".to_string()),
            ],
        )?;

        let records = response
            .values
            .into_iter()
            .filter(|point| point.y.is_finite())
            .filter_map(|point| {
                let ts = utc_from_seconds(point.x)?;
                Some(Record::new(ts).with(&self.column, point.y))
            })
            .collect();
        Ok(clip(records, range))
    }
}

#[derive(Debug, Deserialize)]
struct HolderPoint {
    d: String,
    #[serde(rename = "balAddr10Kbtc")]
    balance: serde_json::Value,
}

/// Number of addresses holding at least 10k BTC, from bitcoin-data.com. The endpoint
/// returns the full history; the requested range is cut out locally.
pub struct LargeHoldersSource {
    http: HttpClient,
    base_url: String,
}

impl LargeHoldersSource {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl MetricSource for LargeHoldersSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let url = format!("{}/v1/balance-addr-10K-BTC", self.base_url);
        let points: Vec<HolderPoint> = self.http.get_json("bitcoin_data", &url, &[])?;

        let mut records = Vec::new();
        for point in points {
            let date = NaiveDate::parse_from_str(&point.d, "%Y-%m-%d")
                .map_err(|err| FetchError::Decode(format!("invalid date {:?}: {err}", point.d)))?;
            if !range.contains(date) {
                continue;
            }
            let balance = match &point.balance {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            };
            if let Some(value) = balance {
                records.push(Record::daily(date, LARGE_HOLDERS_COLUMN, value));
            }
        }
        Ok(records)
    }
}
