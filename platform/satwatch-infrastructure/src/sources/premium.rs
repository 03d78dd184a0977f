use super::{end_of_day_millis, unix_millis, unix_seconds, utc_date_from_millis};
use crate::http::HttpClient;
use chrono::{DateTime, Days, NaiveDate};
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use std::collections::BTreeMap;

pub const PREMIUM_COLUMN: &str = "Coinbase Premium";
/// Coinbase Exchange returns at most 300 candles per request.
const CANDLES_PER_REQUEST: u64 = 300;
const DAY_SECONDS: u32 = 86_400;

/// Coinbase-over-Binance spot premium in percent, from daily closes on both venues.
/// Only dates quoted by both venues produce a value.
pub struct CoinbasePremiumSource {
    http: HttpClient,
    coinbase_url: String,
    binance_url: String,
    product: String,
    symbol: String,
}

impl CoinbasePremiumSource {
    pub fn new(
        http: HttpClient,
        coinbase_url: &str,
        binance_url: &str,
        product: &str,
        symbol: &str,
    ) -> Self {
        Self {
            http,
            coinbase_url: coinbase_url.trim_end_matches('/').to_string(),
            binance_url: binance_url.trim_end_matches('/').to_string(),
            product: product.to_string(),
            symbol: symbol.to_string(),
        }
    }

    fn coinbase_closes(&self, range: &DateRange) -> Result<BTreeMap<NaiveDate, f64>, FetchError> {
        let url = format!("{}/products/{}/candles", self.coinbase_url, self.product);
        // Each row is [time, low, high, open, close, volume].
        let rows: Vec<(i64, f64, f64, f64, f64, f64)> = self.http.get_json(
            "coinbase",
            &url,
            &[
                ("granularity", DAY_SECONDS.to_string()),
                ("start", unix_seconds(range.start()).to_string()),
                ("end", end_of_range_seconds(range.end()).to_string()),
            ],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|(time, _, _, _, close, _)| {
                DateTime::from_timestamp(time, 0).map(|ts| (ts.date_naive(), close))
            })
            .filter(|(date, _)| range.contains(*date))
            .collect())
    }

    fn binance_closes(&self, range: &DateRange) -> Result<BTreeMap<NaiveDate, f64>, FetchError> {
        let url = format!("{}/api/v3/klines", self.binance_url);
        let rows: Vec<Vec<serde_json::Value>> = self.http.get_json(
            "binance_spot",
            &url,
            &[
                ("symbol", self.symbol.clone()),
                ("interval", "1d".to_string()),
                ("startTime", unix_millis(range.start()).to_string()),
                ("endTime", end_of_day_millis(range.end()).to_string()),
                ("limit", "1000".to_string()),
            ],
        )?;

        let mut closes = BTreeMap::new();
        for row in rows {
            let open_time = row.first().and_then(serde_json::Value::as_i64);
            let close = row
                .get(4)
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| raw.parse::<f64>().ok());
            match (open_time.and_then(utc_date_from_millis), close) {
                (Some(date), Some(close)) if range.contains(date) => {
                    closes.insert(date, close);
                }
                (Some(_), Some(_)) => {}
                _ => {
                    return Err(FetchError::Decode(format!(
                        "binance_spot: malformed kline row {row:?}"
                    )))
                }
            }
        }
        Ok(closes)
    }
}

impl MetricSource for CoinbasePremiumSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let mut records = Vec::new();
        for chunk in range.chunks(CANDLES_PER_REQUEST) {
            let coinbase = self.coinbase_closes(&chunk)?;
            let binance = self.binance_closes(&chunk)?;
            for (date, cb) in &coinbase {
                let Some(bn) = binance.get(date) else {
                    continue;
                };
                if *bn == 0.0 {
                    continue;
                }
                records.push(Record::daily(*date, PREMIUM_COLUMN, (cb - bn) / bn * 100.0));
            }
        }
        Ok(records)
    }
}

fn end_of_range_seconds(end: NaiveDate) -> i64 {
    end.checked_add_days(Days::new(1))
        .map(unix_seconds)
        .unwrap_or_else(|| unix_seconds(end))
        - 1
}

#[cfg(test)]
mod tests {
    use super::{CoinbasePremiumSource, PREMIUM_COLUMN};
    use crate::http::{HttpClient, HttpSettings};
    use crate::test_support::{json_ok, try_spawn_server};
    use chrono::NaiveDate;
    use satwatch_domain::repositories::metric_source::MetricSource;
    use satwatch_domain::value_objects::date_range::DateRange;

    #[test]
    fn premium_uses_dates_quoted_on_both_venues() {
        // 2024-01-01 and 2024-01-02 from Coinbase, only 2024-01-01 from Binance.
        let coinbase = r#"[[1704153600,44000,45500,44100,45000,100],[1704067200,42000,44200,42200,44000,90]]"#;
        let binance = r#"[[1704067200000,"42200","44200","42000","40000.0","1000",1704153599999,"0",1,"0","0","0"]]"#;
        let Some(server) = try_spawn_server(vec![json_ok(coinbase), json_ok(binance)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let http = HttpClient::new(&HttpSettings {
            retries: 0,
            ..HttpSettings::default()
        })
        .expect("client");
        let source = CoinbasePremiumSource::new(
            http,
            &server.base_url,
            &server.base_url,
            "BTC-USD",
            "BTCUSDT",
        );
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            NaiveDate::from_ymd_opt(2024, 1, 2).expect("date"),
        )
        .expect("range");

        let records = source.fetch(&range).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date(), NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"));
        let premium = records[0].get(PREMIUM_COLUMN).expect("premium");
        assert!((premium - 10.0).abs() < 1e-9, "{premium}");

        let requests = server.requests();
        assert!(requests[0].starts_with("GET /products/BTC-USD/candles?granularity=86400"));
        assert!(requests[1].starts_with("GET /api/v3/klines?symbol=BTCUSDT"));
    }
}
