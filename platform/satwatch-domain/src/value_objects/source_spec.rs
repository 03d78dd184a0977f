use serde::{Deserialize, Serialize};

/// Which upstream a metric is synced from and how its payload maps onto columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    YahooClose {
        symbol: String,
        column: String,
    },
    YahooVolume {
        symbol: String,
        column: String,
    },
    YahooEtf {
        symbols: Vec<String>,
    },
    BinanceFundingRate {
        symbol: String,
    },
    BinanceOpenInterest {
        symbol: String,
    },
    BlockchainChart {
        chart: String,
        column: String,
    },
    LargeHolders,
    FearGreed,
    SearchTrends {
        keywords: Vec<String>,
    },
    CoinbasePremium {
        coinbase_product: String,
        binance_symbol: String,
    },
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::YahooClose { .. } => "yahoo_close",
            SourceSpec::YahooVolume { .. } => "yahoo_volume",
            SourceSpec::YahooEtf { .. } => "yahoo_etf",
            SourceSpec::BinanceFundingRate { .. } => "binance_funding_rate",
            SourceSpec::BinanceOpenInterest { .. } => "binance_open_interest",
            SourceSpec::BlockchainChart { .. } => "blockchain_chart",
            SourceSpec::LargeHolders => "large_holders",
            SourceSpec::FearGreed => "fear_greed",
            SourceSpec::SearchTrends { .. } => "search_trends",
            SourceSpec::CoinbasePremium { .. } => "coinbase_premium",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let kind = self.kind();
        let require = |label: &str, value: &str| {
            if value.trim().is_empty() {
                Err(format!("source {kind}: {label} must not be empty"))
            } else {
                Ok(())
            }
        };
        match self {
            SourceSpec::YahooClose { symbol, column } | SourceSpec::YahooVolume { symbol, column } => {
                require("symbol", symbol)?;
                require("column", column)
            }
            SourceSpec::YahooEtf { symbols } => {
                if symbols.is_empty() {
                    return Err(format!("source {kind}: symbols must not be empty"));
                }
                symbols.iter().try_for_each(|s| require("symbol", s))
            }
            SourceSpec::BinanceFundingRate { symbol } | SourceSpec::BinanceOpenInterest { symbol } => {
                require("symbol", symbol)
            }
            SourceSpec::BlockchainChart { chart, column } => {
                require("chart", chart)?;
                require("column", column)
            }
            SourceSpec::LargeHolders | SourceSpec::FearGreed => Ok(()),
            SourceSpec::SearchTrends { keywords } => {
                if keywords.is_empty() {
                    return Err(format!("source {kind}: keywords must not be empty"));
                }
                keywords.iter().try_for_each(|k| require("keyword", k))
            }
            SourceSpec::CoinbasePremium {
                coinbase_product,
                binance_symbol,
            } => {
                require("coinbase_product", coinbase_product)?;
                require("binance_symbol", binance_symbol)
            }
        }
    }
}

/// Whether a source only produces observations on exchange trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarPolicy {
    #[default]
    Continuous,
    Nyse,
}

/// How a gap range is requested upstream: in one call, or one request per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[default]
    Range,
    Daily,
}
