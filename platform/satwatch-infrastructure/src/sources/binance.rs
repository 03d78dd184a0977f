use super::{clip, end_of_day_millis, unix_millis, utc_date_from_millis};
use crate::http::HttpClient;
use chrono::{Days, NaiveDate, Utc};
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use serde::Deserialize;
use std::collections::BTreeMap;

const FUNDING_PAGE_LIMIT: usize = 1000;
/// Binance only serves the most recent 30 days of open-interest history.
const OPEN_INTEREST_RETENTION_DAYS: u64 = 29;
pub const FUNDING_RATE_COLUMN: &str = "Funding Rate";
pub const OPEN_INTEREST_COLUMN: &str = "Open Interest";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEvent {
    funding_time: i64,
    funding_rate: String,
}

/// Perpetual funding events (several per day) collapsed to one daily mean, in percent.
pub struct FundingRateSource {
    http: HttpClient,
    base_url: String,
    symbol: String,
}

impl FundingRateSource {
    pub fn new(http: HttpClient, base_url: &str, symbol: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            symbol: symbol.to_string(),
        }
    }
}

impl MetricSource for FundingRateSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let url = format!("{}/fapi/v1/fundingRate", self.base_url);
        let end_time = end_of_day_millis(range.end());
        let mut start_time = unix_millis(range.start());
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        while start_time <= end_time {
            let page: Vec<FundingEvent> = self.http.get_json(
                "binance_funding",
                &url,
                &[
                    ("symbol", self.symbol.clone()),
                    ("startTime", start_time.to_string()),
                    ("endTime", end_time.to_string()),
                    ("limit", FUNDING_PAGE_LIMIT.to_string()),
                ],
            )?;
            let Some(last) = page.last().map(|e| e.funding_time) else {
                break;
            };
            for event in &page {
                let rate: f64 = event.funding_rate.parse().map_err(|_| {
                    FetchError::Decode(format!("invalid fundingRate {:?}", event.funding_rate))
                })?;
                let Some(date) = utc_date_from_millis(event.funding_time) else {
                    continue;
                };
                let entry = by_date.entry(date).or_insert((0.0, 0));
                entry.0 += rate * 100.0;
                entry.1 += 1;
            }
            if page.len() < FUNDING_PAGE_LIMIT {
                break;
            }
            start_time = last + 1;
        }

        let records = by_date
            .into_iter()
            .map(|(date, (sum, n))| Record::daily(date, FUNDING_RATE_COLUMN, sum / n as f64))
            .collect();
        Ok(clip(records, range))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenInterestPoint {
    sum_open_interest: String,
    timestamp: i64,
}

/// Daily open-interest history. Ranges older than the upstream retention come back empty.
pub struct OpenInterestSource {
    http: HttpClient,
    base_url: String,
    symbol: String,
}

impl OpenInterestSource {
    pub fn new(http: HttpClient, base_url: &str, symbol: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            symbol: symbol.to_string(),
        }
    }

    fn fetch_since(&self, range: &DateRange, retained_from: NaiveDate) -> Result<Vec<Record>, FetchError> {
        let start = range.start().max(retained_from);
        if start > range.end() {
            tracing::debug!(range = %range, retained_from = %retained_from, "range predates open interest retention");
            return Ok(Vec::new());
        }

        let url = format!("{}/futures/data/openInterestHist", self.base_url);
        let points: Vec<OpenInterestPoint> = self.http.get_json(
            "binance_open_interest",
            &url,
            &[
                ("symbol", self.symbol.clone()),
                ("period", "1d".to_string()),
                ("limit", "500".to_string()),
                ("startTime", unix_millis(start).to_string()),
                ("endTime", end_of_day_millis(range.end()).to_string()),
            ],
        )?;

        let mut records = Vec::with_capacity(points.len());
        for point in points {
            let value: f64 = point.sum_open_interest.parse().map_err(|_| {
                FetchError::Decode(format!("invalid sumOpenInterest {:?}", point.sum_open_interest))
            })?;
            if let Some(date) = utc_date_from_millis(point.timestamp) {
                records.push(Record::daily(date, OPEN_INTEREST_COLUMN, value));
            }
        }
        Ok(clip(records, range))
    }
}

impl MetricSource for OpenInterestSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let today = Utc::now().date_naive();
        let retained_from = today
            .checked_sub_days(Days::new(OPEN_INTEREST_RETENTION_DAYS))
            .unwrap_or(today);
        self.fetch_since(range, retained_from)
    }
}

#[cfg(test)]
mod tests {
    use super::{FundingRateSource, OpenInterestSource, FUNDING_RATE_COLUMN, OPEN_INTEREST_COLUMN};
    use crate::http::{HttpClient, HttpSettings};
    use crate::test_support::{json_ok, try_spawn_server};
    use chrono::NaiveDate;
    use satwatch_domain::repositories::metric_source::MetricSource;
    use satwatch_domain::value_objects::date_range::DateRange;

    fn client() -> HttpClient {
        HttpClient::new(&HttpSettings {
            retries: 0,
            ..HttpSettings::default()
        })
        .expect("client")
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
    }

    #[test]
    fn funding_events_collapse_to_daily_mean_percent() {
        // Three events on 2024-01-01 and one on 2024-01-02.
        let body = r#"[
            {"symbol":"BTCUSDT","fundingTime":1704067200000,"fundingRate":"0.00010000"},
            {"symbol":"BTCUSDT","fundingTime":1704096000000,"fundingRate":"0.00020000"},
            {"symbol":"BTCUSDT","fundingTime":1704124800000,"fundingRate":"0.00030000"},
            {"symbol":"BTCUSDT","fundingTime":1704153600000,"fundingRate":"-0.00010000"}
        ]"#;
        let Some(server) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = FundingRateSource::new(client(), &server.base_url, "BTCUSDT");
        let records = source
            .fetch(&DateRange::new(d(1), d(2)).expect("range"))
            .expect("records");

        assert_eq!(records.len(), 2);
        let first = records[0].get(FUNDING_RATE_COLUMN).expect("value");
        assert!((first - 0.02).abs() < 1e-12, "{first}");
        let second = records[1].get(FUNDING_RATE_COLUMN).expect("value");
        assert!((second + 0.01).abs() < 1e-12, "{second}");

        let request = &server.requests()[0];
        assert!(request.contains("startTime=1704067200000"), "{request}");
        assert!(request.contains("endTime=1704239999999"), "{request}");
    }

    #[test]
    fn full_funding_page_requests_the_next_page() {
        // 1000 events one minute apart on 2024-01-01, then a short page on 2024-01-02.
        let first_ts = 1_704_067_200_000_i64;
        let full_page = (0..1000)
            .map(|i| {
                format!(
                    r#"{{"symbol":"BTCUSDT","fundingTime":{},"fundingRate":"0.00010000"}}"#,
                    first_ts + i * 60_000
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        let last_page = r#"[{"symbol":"BTCUSDT","fundingTime":1704153600000,"fundingRate":"0.00030000"}]"#;
        let Some(server) = try_spawn_server(vec![json_ok(&format!("[{full_page}]")), json_ok(last_page)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = FundingRateSource::new(client(), &server.base_url, "BTCUSDT");
        let records = source
            .fetch(&DateRange::new(d(1), d(2)).expect("range"))
            .expect("records");

        assert_eq!(records.len(), 2);
        let first = records[0].get(FUNDING_RATE_COLUMN).expect("value");
        assert!((first - 0.01).abs() < 1e-12, "{first}");
        let second = records[1].get(FUNDING_RATE_COLUMN).expect("value");
        assert!((second - 0.03).abs() < 1e-12, "{second}");

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        let next_start = first_ts + 999 * 60_000 + 1;
        assert!(requests[1].contains(&format!("startTime={next_start}")), "{}", requests[1]);
        assert!(requests[1].contains("endTime=1704239999999"), "{}", requests[1]);
    }

    #[test]
    fn open_interest_before_retention_is_empty_without_a_request() {
        let source = OpenInterestSource::new(client(), "http://127.0.0.1:9", "BTCUSDT");
        let records = source
            .fetch_since(&DateRange::new(d(1), d(5)).expect("range"), d(20))
            .expect("records");
        assert!(records.is_empty());
    }

    #[test]
    fn open_interest_history_is_clamped_to_retention() {
        let body = r#"[
            {"symbol":"BTCUSDT","sumOpenInterest":"80000.5","sumOpenInterestValue":"1","timestamp":1705622400000},
            {"symbol":"BTCUSDT","sumOpenInterest":"81000.0","sumOpenInterestValue":"1","timestamp":1705708800000}
        ]"#;
        let Some(server) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = OpenInterestSource::new(client(), &server.base_url, "BTCUSDT");
        let records = source
            .fetch_since(&DateRange::new(d(1), d(20)).expect("range"), d(19))
            .expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date(), d(19));
        assert_eq!(records[1].get(OPEN_INTEREST_COLUMN), Some(81000.0));
        let request = &server.requests()[0];
        assert!(request.contains("startTime=1705622400000"), "{request}");
    }
}
