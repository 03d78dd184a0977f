use serde::{Deserialize, Serialize};
use std::fmt;

const STRONG_THRESHOLD: f64 = 0.8;
const WEAK_THRESHOLD: f64 = 0.3;

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const GREED_EXTREME: f64 = 75.0;
const FEAR_EXTREME: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalClass {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl SignalClass {
    pub fn score(self) -> i8 {
        match self {
            SignalClass::StrongSell => -2,
            SignalClass::Sell => -1,
            SignalClass::Neutral => 0,
            SignalClass::Buy => 1,
            SignalClass::StrongBuy => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalClass::StrongSell => "strong sell",
            SignalClass::Sell => "sell",
            SignalClass::Neutral => "neutral",
            SignalClass::Buy => "buy",
            SignalClass::StrongBuy => "strong buy",
        }
    }
}

impl fmt::Display for SignalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Buckets a normalized composite score. Both outer thresholds are inclusive.
pub fn classify(score: f64) -> SignalClass {
    if score >= STRONG_THRESHOLD {
        SignalClass::StrongBuy
    } else if score >= WEAK_THRESHOLD {
        SignalClass::Buy
    } else if score <= -STRONG_THRESHOLD {
        SignalClass::StrongSell
    } else if score <= -WEAK_THRESHOLD {
        SignalClass::Sell
    } else {
        SignalClass::Neutral
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalWeights {
    pub rsi: f64,
    pub macd: f64,
    pub moving_average: f64,
    pub sentiment: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            rsi: 1.0,
            macd: 1.5,
            moving_average: 2.0,
            sentiment: 0.5,
        }
    }
}

impl SignalWeights {
    pub fn total(&self) -> f64 {
        self.rsi + self.macd + self.moving_average + self.sentiment
    }

    pub fn validate(&self) -> Result<(), String> {
        let all = [self.rsi, self.macd, self.moving_average, self.sentiment];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("signal weights must be finite and non-negative".to_string());
        }
        if self.total() <= 0.0 {
            return Err("signal weights must not all be zero".to_string());
        }
        Ok(())
    }
}

/// Per-rule votes, each in `-1..=1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubSignals {
    pub rsi: i8,
    pub macd: i8,
    pub trend: i8,
    pub sentiment: i8,
}

pub fn rsi_vote(rsi: Option<f64>) -> i8 {
    match rsi {
        Some(v) if v > RSI_OVERBOUGHT => -1,
        Some(v) if v < RSI_OVERSOLD => 1,
        _ => 0,
    }
}

pub fn macd_vote(histogram: Option<f64>) -> i8 {
    match histogram {
        Some(v) if v > 0.0 => 1,
        Some(v) if v < 0.0 => -1,
        _ => 0,
    }
}

pub fn trend_vote(price: f64, trend_sma: Option<f64>) -> i8 {
    match trend_sma {
        Some(sma) if price > sma => 1,
        Some(sma) if price < sma => -1,
        _ => 0,
    }
}

pub fn sentiment_vote(fear_greed: Option<f64>) -> i8 {
    match fear_greed {
        Some(v) if v > GREED_EXTREME => -1,
        Some(v) if v < FEAR_EXTREME => 1,
        _ => 0,
    }
}

pub fn composite_score(votes: &SubSignals, weights: &SignalWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted = f64::from(votes.rsi) * weights.rsi
        + f64::from(votes.macd) * weights.macd
        + f64::from(votes.trend) * weights.moving_average
        + f64::from(votes.sentiment) * weights.sentiment;
    weighted / total
}

/// Inputs aligned index-by-index with the price series.
pub struct SignalInputs<'a> {
    pub close: &'a [f64],
    pub rsi: &'a [Option<f64>],
    pub macd_histogram: &'a [f64],
    pub trend_sma: &'a [Option<f64>],
    pub fear_greed: &'a [Option<f64>],
}

pub fn market_signals(inputs: &SignalInputs<'_>, weights: &SignalWeights) -> Vec<SignalClass> {
    inputs
        .close
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let votes = SubSignals {
                rsi: rsi_vote(inputs.rsi.get(i).copied().flatten()),
                macd: macd_vote(inputs.macd_histogram.get(i).copied()),
                trend: trend_vote(*price, inputs.trend_sma.get(i).copied().flatten()),
                sentiment: sentiment_vote(inputs.fear_greed.get(i).copied().flatten()),
            };
            classify(composite_score(&votes, weights))
        })
        .collect()
}
