pub mod binance;
pub mod blockchain;
pub mod premium;
pub mod sentiment;
pub mod stepper;
pub mod yahoo;

use crate::calendar::NyseCalendar;
use crate::http::HttpClient;
use binance::{FundingRateSource, OpenInterestSource};
use blockchain::{BlockchainChartSource, LargeHoldersSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use premium::CoinbasePremiumSource;
use satwatch_domain::repositories::calendar::{AlwaysOpen, TradingCalendar};
use satwatch_domain::repositories::metric_source::MetricSource;
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use satwatch_domain::value_objects::source_spec::{Cadence, CalendarPolicy, SourceSpec};
use sentiment::{FearGreedSource, SearchTrendsSource};
use std::time::Duration;
use stepper::DailyStepper;
use yahoo::{YahooChart, YahooEtfSource, YahooField, YahooSeriesSource};

/// Upstream base URLs, one per provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
    pub yahoo: String,
    pub binance_futures: String,
    pub binance_spot: String,
    pub blockchain: String,
    pub bitcoin_data: String,
    pub fear_greed: String,
    pub google_trends: String,
    pub coinbase: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            yahoo: "https://query1.finance.yahoo.com".to_string(),
            binance_futures: "https://fapi.binance.com".to_string(),
            binance_spot: "https://api.binance.com".to_string(),
            blockchain: "https://api.blockchain.info".to_string(),
            bitcoin_data: "https://bitcoin-data.com".to_string(),
            fear_greed: "https://api.alternative.me".to_string(),
            google_trends: "https://trends.google.com".to_string(),
            coinbase: "https://api.exchange.coinbase.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceOptions {
    pub calendar: CalendarPolicy,
    pub cadence: Cadence,
    pub pacing: Duration,
}

/// Maps a metric's source description onto a concrete adapter. Daily cadence wraps the
/// adapter in a [`DailyStepper`] that walks the range one trading day at a time.
pub fn build_source(
    spec: &SourceSpec,
    options: &SourceOptions,
    http: &HttpClient,
    endpoints: &SourceEndpoints,
) -> Box<dyn MetricSource> {
    let yahoo = || YahooChart::new(http.clone(), &endpoints.yahoo);
    let inner: Box<dyn MetricSource> = match spec {
        SourceSpec::YahooClose { symbol, column } => Box::new(YahooSeriesSource::new(
            yahoo(),
            symbol,
            YahooField::Close(column.clone()),
        )),
        SourceSpec::YahooVolume { symbol, column } => Box::new(YahooSeriesSource::new(
            yahoo(),
            symbol,
            YahooField::Volume(column.clone()),
        )),
        SourceSpec::YahooEtf { symbols } => Box::new(YahooEtfSource::new(yahoo(), symbols.clone())),
        SourceSpec::BinanceFundingRate { symbol } => Box::new(FundingRateSource::new(
            http.clone(),
            &endpoints.binance_futures,
            symbol,
        )),
        SourceSpec::BinanceOpenInterest { symbol } => Box::new(OpenInterestSource::new(
            http.clone(),
            &endpoints.binance_futures,
            symbol,
        )),
        SourceSpec::BlockchainChart { chart, column } => Box::new(BlockchainChartSource::new(
            http.clone(),
            &endpoints.blockchain,
            chart,
            column,
        )),
        SourceSpec::LargeHolders => {
            Box::new(LargeHoldersSource::new(http.clone(), &endpoints.bitcoin_data))
        }
        SourceSpec::FearGreed => Box::new(FearGreedSource::new(http.clone(), &endpoints.fear_greed)),
        SourceSpec::SearchTrends { keywords } => Box::new(SearchTrendsSource::new(
            http.clone(),
            &endpoints.google_trends,
            keywords.clone(),
            options.pacing,
        )),
        SourceSpec::CoinbasePremium {
            coinbase_product,
            binance_symbol,
        } => Box::new(CoinbasePremiumSource::new(
            http.clone(),
            &endpoints.coinbase,
            &endpoints.binance_spot,
            coinbase_product,
            binance_symbol,
        )),
    };

    match options.cadence {
        Cadence::Range => inner,
        Cadence::Daily => {
            let calendar: Box<dyn TradingCalendar> = match options.calendar {
                CalendarPolicy::Continuous => Box::new(AlwaysOpen),
                CalendarPolicy::Nyse => Box::new(NyseCalendar::new()),
            };
            Box::new(DailyStepper::new(inner, calendar, options.pacing))
        }
    }
}

/// Drops records outside `range`; upstreams often return more than was asked for.
pub(crate) fn clip(records: Vec<Record>, range: &DateRange) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| range.contains(record.date()))
        .collect()
}

pub(crate) fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

pub(crate) fn unix_millis(date: NaiveDate) -> i64 {
    unix_seconds(date) * 1000
}

/// Last millisecond of `date` in UTC.
pub(crate) fn end_of_day_millis(date: NaiveDate) -> i64 {
    unix_millis(date) + 86_400_000 - 1
}

pub(crate) fn utc_from_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|ts| ts.naive_utc())
}

pub(crate) fn utc_date_from_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|ts| ts.date_naive())
}
