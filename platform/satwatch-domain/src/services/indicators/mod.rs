mod rolling;

use chrono::NaiveDate;
use rolling::{Ema, RollingCorrelation, RollingRsi, RollingSma};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    pub rsi_periods: usize,
    pub ma_periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub correlation_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_periods: 14,
            ma_periods: vec![21, 50, 200],
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            correlation_window: 30,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.rsi_periods == 0 {
            return Err("indicators.rsi_periods must be > 0".to_string());
        }
        if self.ma_periods.iter().any(|p| *p == 0) {
            return Err("indicators.ma_periods must all be > 0".to_string());
        }
        if self.macd_fast == 0 || self.macd_slow == 0 || self.macd_signal == 0 {
            return Err("indicators.macd spans must be > 0".to_string());
        }
        if self.correlation_window < 2 {
            return Err("indicators.correlation_window must be >= 2".to_string());
        }
        Ok(())
    }

    /// Longest moving-average period, used as the trend filter for the composite signal.
    pub fn trend_period(&self) -> usize {
        self.ma_periods.iter().copied().max().unwrap_or(200)
    }
}

pub fn rsi(prices: &[f64], periods: usize) -> Vec<Option<f64>> {
    let mut state = RollingRsi::new(periods);
    prices.iter().map(|p| state.update(*p)).collect()
}

pub fn sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut state = RollingSma::new(period);
    prices.iter().map(|p| state.update(*p)).collect()
}

pub fn ema(prices: &[f64], span: usize) -> Vec<f64> {
    let mut state = Ema::with_span(span);
    prices.iter().map(|p| state.update(*p)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    pub period: usize,
    pub sma: Vec<Option<f64>>,
    pub ema: Vec<f64>,
}

pub fn moving_averages(prices: &[f64], periods: &[usize]) -> Vec<MovingAverage> {
    periods
        .iter()
        .map(|period| MovingAverage {
            period: *period,
            sma: sma(prices, *period),
            ema: ema(prices, *period),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();
    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Rolling Pearson correlation of day-over-day percentage changes on the dates both
/// series share. The first shared date has no change and is always undefined.
pub fn rolling_correlation(
    a: &BTreeMap<NaiveDate, f64>,
    b: &BTreeMap<NaiveDate, f64>,
    window: usize,
) -> Vec<(NaiveDate, Option<f64>)> {
    let joined: Vec<(NaiveDate, f64, f64)> = a
        .iter()
        .filter_map(|(date, x)| b.get(date).map(|y| (*date, *x, *y)))
        .filter(|(_, x, y)| x.is_finite() && y.is_finite())
        .collect();

    let mut state = RollingCorrelation::new(window);
    let mut prev: Option<(f64, f64)> = None;
    let mut out = Vec::with_capacity(joined.len());
    for (date, x, y) in joined {
        let change = prev.and_then(|(px, py)| {
            (px != 0.0 && py != 0.0).then(|| (x / px - 1.0, y / py - 1.0))
        });
        prev = Some((x, y));
        out.push((date, state.update(change)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{ema, macd, moving_averages, rolling_correlation, rsi, sma, IndicatorConfig};
    use chrono::{Days, NaiveDate};
    use std::collections::BTreeMap;

    fn daily(values: &[f64]) -> BTreeMap<NaiveDate, f64> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start.checked_add_days(Days::new(i as u64)).unwrap(), *v))
            .collect()
    }

    #[test]
    fn rsi_is_undefined_for_first_periods_minus_one() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&prices, 14);
        assert!(values[..13].iter().all(Option::is_none));
        assert!(values[13..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_of_rising_prices_is_100_and_falling_is_0() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let last = rsi(&rising, 14).last().copied().flatten().expect("rsi");
        assert!((last - 100.0).abs() < 1e-9);

        let falling: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let last = rsi(&falling, 14).last().copied().flatten().expect("rsi");
        assert!(last.abs() < 1e-9);
    }

    #[test]
    fn rsi_is_bounded_for_mixed_prices() {
        let prices = [10.0, 11.0, 10.5, 12.0, 11.0, 13.0, 12.5, 12.0, 14.0, 13.0];
        for value in rsi(&prices, 4).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
        let flat = [5.0; 10];
        assert!(rsi(&flat, 4).iter().all(Option::is_none));
    }

    #[test]
    fn sma_and_ema_follow_their_definitions() {
        let prices = [10.0, 20.0, 30.0];
        let s = sma(&prices, 2);
        assert_eq!(s[0], None);
        assert!((s[1].unwrap() - 15.0).abs() < 1e-12);
        assert!((s[2].unwrap() - 25.0).abs() < 1e-12);

        // span 3 => alpha 0.5
        let e = ema(&prices, 3);
        assert_eq!(e[0], 10.0);
        assert!((e[1] - 15.0).abs() < 1e-12);
        assert!((e[2] - 22.5).abs() < 1e-12);

        let mas = moving_averages(&prices, &[2, 3]);
        assert_eq!(mas.len(), 2);
        assert_eq!(mas[1].period, 3);
        assert!((mas[1].sma[2].unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let result = macd(&prices, 12, 26, 9);
        assert_eq!(result.line.len(), prices.len());
        assert_eq!(result.line[0], 0.0);
        for i in 0..prices.len() {
            assert!((result.histogram[i] - (result.line[i] - result.signal[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn correlation_of_proportional_series_is_one() {
        let a: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        let b: Vec<f64> = a.iter().map(|v| v * 2.0).collect();
        let corr = rolling_correlation(&daily(&a), &daily(&b), 30);
        assert_eq!(corr.len(), 40);
        assert!(corr[..30].iter().all(|(_, v)| v.is_none()));
        let last = corr.last().and_then(|(_, v)| *v).expect("corr");
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_only_uses_shared_dates() {
        let a = daily(&[1.0, 2.0, 3.0, 4.0]);
        let mut b = daily(&[1.0, 2.0, 3.0, 4.0]);
        b.remove(&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let corr = rolling_correlation(&a, &b, 2);
        assert_eq!(corr.len(), 3);
    }

    #[test]
    fn default_config_matches_conventional_periods() {
        let config = IndicatorConfig::default();
        assert_eq!(config.rsi_periods, 14);
        assert_eq!(config.ma_periods, vec![21, 50, 200]);
        assert_eq!(config.trend_period(), 200);
        assert!(config.validate().is_ok());
    }
}
