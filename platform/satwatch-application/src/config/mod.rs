use satwatch_domain::services::indicators::IndicatorConfig;
use satwatch_domain::services::signal::SignalWeights;
use satwatch_domain::value_objects::lookback::Lookback;
use satwatch_domain::value_objects::source_spec::{Cadence, CalendarPolicy, SourceSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Metric names of the built-in collection set. They double as file stems in the data directory.
pub mod metric_names {
    pub const BTCUSD: &str = "btcusd";
    pub const DXY: &str = "dxy";
    pub const SP500: &str = "sp500";
    pub const GOLD: &str = "gold";
    pub const LARGE_HOLDERS: &str = "large_holders";
    pub const ACTIVE_ADDRESSES: &str = "active_addresses";
    pub const HASH_RATE: &str = "hash_rate";
    pub const FUNDING_RATES: &str = "funding_rates";
    pub const OPEN_INTEREST: &str = "open_interest";
    pub const FEAR_GREED: &str = "fear_greed";
    pub const GOOGLE_TRENDS: &str = "google_trends";
    pub const TRADING_VOLUME: &str = "trading_volume";
    pub const COINBASE_PREMIUM: &str = "coinbase_premium";
    pub const ETF: &str = "etf";
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    pub indicators: Option<IndicatorConfig>,
    pub signal: Option<SignalWeights>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub data_dir: String,
    pub lookback: String,
    pub chart_path: String,
    pub summary_path: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: "market_data".to_string(),
            lookback: "1y".to_string(),
            chart_path: "crypto_analysis.html".to_string(),
            summary_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 3,
            backoff_ms: 1_000,
            user_agent: concat!("satwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Upstream base URLs. Overridable for mirrors and local test servers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EndpointsConfig {
    pub yahoo: String,
    pub binance_futures: String,
    pub binance_spot: String,
    pub blockchain: String,
    pub bitcoin_data: String,
    pub fear_greed: String,
    pub google_trends: String,
    pub coinbase: String,
}

impl Default for EndpointsConfig {
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

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub calendar: CalendarPolicy,
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(default)]
    pub pacing_ms: u64,
    pub source: SourceSpec,
}

impl MetricSpec {
    fn range(name: &str, source: SourceSpec) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            calendar: CalendarPolicy::Continuous,
            cadence: Cadence::Range,
            pacing_ms: 0,
            source,
        }
    }

    fn trading_days(name: &str, source: SourceSpec) -> Self {
        Self {
            calendar: CalendarPolicy::Nyse,
            cadence: Cadence::Daily,
            pacing_ms: 250,
            ..Self::range(name, source)
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_metrics() -> Vec<MetricSpec> {
    use metric_names::*;

    let yahoo_close = |symbol: &str, column: &str| SourceSpec::YahooClose {
        symbol: symbol.to_string(),
        column: column.to_string(),
    };

    vec![
        MetricSpec::range(BTCUSD, yahoo_close("BTC-USD", "BTCUSD Price")),
        MetricSpec::trading_days(DXY, yahoo_close("DX-Y.NYB", "DXY Price")),
        MetricSpec::trading_days(SP500, yahoo_close("^GSPC", "SP500 Price")),
        MetricSpec::trading_days(GOLD, yahoo_close("GLD", "Gold Price")),
        MetricSpec::range(LARGE_HOLDERS, SourceSpec::LargeHolders),
        MetricSpec::range(
            ACTIVE_ADDRESSES,
            SourceSpec::BlockchainChart {
                chart: "n-unique-addresses".to_string(),
                column: "Active Addresses".to_string(),
            },
        ),
        MetricSpec::range(
            HASH_RATE,
            SourceSpec::BlockchainChart {
                chart: "hash-rate".to_string(),
                column: "Hash Rate".to_string(),
            },
        ),
        MetricSpec::range(
            FUNDING_RATES,
            SourceSpec::BinanceFundingRate {
                symbol: "BTCUSDT".to_string(),
            },
        ),
        MetricSpec::range(
            OPEN_INTEREST,
            SourceSpec::BinanceOpenInterest {
                symbol: "BTCUSDT".to_string(),
            },
        ),
        MetricSpec::range(FEAR_GREED, SourceSpec::FearGreed),
        MetricSpec {
            pacing_ms: 1_000,
            ..MetricSpec::range(
                GOOGLE_TRENDS,
                SourceSpec::SearchTrends {
                    keywords: vec!["bitcoin".to_string(), "BTC".to_string(), "crypto".to_string()],
                },
            )
        },
        MetricSpec::range(
            TRADING_VOLUME,
            SourceSpec::YahooVolume {
                symbol: "BTC-USD".to_string(),
                column: "Trading Volume".to_string(),
            },
        ),
        MetricSpec::range(
            COINBASE_PREMIUM,
            SourceSpec::CoinbasePremium {
                coinbase_product: "BTC-USD".to_string(),
                binance_symbol: "BTCUSDT".to_string(),
            },
        ),
        MetricSpec::trading_days(
            ETF,
            SourceSpec::YahooEtf {
                symbols: vec!["GBTC".to_string(), "BITO".to_string()],
            },
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            http: HttpConfig::default(),
            endpoints: EndpointsConfig::default(),
            indicators: None,
            signal: None,
            metrics: default_metrics(),
        }
    }
}

impl Config {
    pub fn lookback(&self) -> Result<Lookback, String> {
        Lookback::parse(&self.run.lookback)
            .map_err(|err| format!("run.lookback {:?}: {err}", self.run.lookback))
    }

    pub fn indicators(&self) -> IndicatorConfig {
        self.indicators.clone().unwrap_or_default()
    }

    pub fn signal_weights(&self) -> SignalWeights {
        self.signal.clone().unwrap_or_default()
    }

    pub fn enabled_metrics(&self) -> impl Iterator<Item = &MetricSpec> {
        self.metrics.iter().filter(|metric| metric.enabled)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.run.data_dir.trim().is_empty() {
            return Err("run.data_dir must not be empty".to_string());
        }
        if self.run.chart_path.trim().is_empty() {
            return Err("run.chart_path must not be empty".to_string());
        }
        self.lookback()?;
        if self.http.timeout_ms == 0 {
            return Err("http.timeout_ms must be > 0".to_string());
        }
        if let Some(indicators) = &self.indicators {
            indicators.validate()?;
        }
        if let Some(weights) = &self.signal {
            weights.validate()?;
        }

        let mut seen = BTreeSet::new();
        for metric in &self.metrics {
            let name = metric.name.trim();
            if name.is_empty() {
                return Err("metrics: name must not be empty".to_string());
            }
            if name.contains(['/', '\\']) {
                return Err(format!("metrics.{name}: name must not contain path separators"));
            }
            if !seen.insert(name.to_string()) {
                return Err(format!("metrics: duplicate metric name {name}"));
            }
            metric
                .source
                .validate()
                .map_err(|err| format!("metrics.{name}: {err}"))?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}
