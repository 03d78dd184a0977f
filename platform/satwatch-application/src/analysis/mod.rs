use crate::collector::CollectionReport;
use crate::config::metric_names;
use chrono::{NaiveDate, NaiveDateTime};
use satwatch_domain::entities::market_report::{Line, MarketReport, MetricPanel, PricePanel};
use satwatch_domain::entities::time_series::TimeSeries;
use satwatch_domain::services::indicators::{
    macd, moving_averages, rolling_correlation, rsi, sma, IndicatorConfig,
};
use satwatch_domain::services::signal::{market_signals, SignalInputs, SignalWeights};
use satwatch_domain::value_objects::fetch_window::FetchWindow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info_span};

pub const BTC_PRICE: &str = "BTCUSD Price";
pub const DXY_PRICE: &str = "DXY Price";
pub const SP500_PRICE: &str = "SP500 Price";
pub const FEAR_GREED_VALUE: &str = "Fear & Greed Value";
const TREND_SUFFIX: &str = " Trend";

struct PanelDef {
    metric: &'static str,
    column: &'static str,
    title: &'static str,
    y_label: Option<&'static str>,
    y_range: Option<(f64, f64)>,
}

const PANELS: &[PanelDef] = &[
    PanelDef {
        metric: metric_names::LARGE_HOLDERS,
        column: "Total Holdings",
        title: "Large Holders",
        y_label: Some("BTC"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::FUNDING_RATES,
        column: "Funding Rate",
        title: "Funding Rates (%)",
        y_label: Some("%"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::FEAR_GREED,
        column: FEAR_GREED_VALUE,
        title: "Fear & Greed Index",
        y_label: None,
        y_range: Some((0.0, 100.0)),
    },
    PanelDef {
        metric: metric_names::OPEN_INTEREST,
        column: "Open Interest",
        title: "Open Interest (BTC)",
        y_label: Some("BTC"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::TRADING_VOLUME,
        column: "Trading Volume",
        title: "Volume (USD)",
        y_label: Some("USD"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::ACTIVE_ADDRESSES,
        column: "Active Addresses",
        title: "Number of Addresses",
        y_label: None,
        y_range: None,
    },
    PanelDef {
        metric: metric_names::HASH_RATE,
        column: "Hash Rate",
        title: "Hash Rate (TH/s)",
        y_label: Some("TH/s"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::COINBASE_PREMIUM,
        column: "Coinbase Premium",
        title: "Premium (%)",
        y_label: Some("%"),
        y_range: None,
    },
    PanelDef {
        metric: metric_names::ETF,
        column: "GBTC Price",
        title: "GBTC Price (USD)",
        y_label: Some("USD"),
        y_range: None,
    },
];

/// Folds the collected series into the renderer-facing report: BTC price with indicators and
/// composite signals, BTC correlations, and one panel per remaining metric.
pub fn build_market_report(
    collection: &CollectionReport,
    indicators: &IndicatorConfig,
    weights: &SignalWeights,
    generated_at: NaiveDateTime,
) -> MarketReport {
    let window = collection.window;
    let _span = info_span!("build_market_report", window = %window).entered();

    let btc = collection
        .series(metric_names::BTCUSD)
        .map(|s| s.daily_column(BTC_PRICE))
        .filter(|column| !column.is_empty());
    let fear_greed = collection
        .series(metric_names::FEAR_GREED)
        .map(|s| s.daily_column(FEAR_GREED_VALUE))
        .unwrap_or_default();

    let price = btc
        .as_ref()
        .and_then(|close| price_panel(close, &fear_greed, &window, indicators, weights));

    let mut correlations = Vec::new();
    if let Some(btc) = &btc {
        let pairs = [
            (metric_names::DXY, DXY_PRICE, "BTC-DXY Correlation", "BTC-DXY"),
            (metric_names::SP500, SP500_PRICE, "BTC-S&P500 Correlation", "BTC-S&P500"),
        ];
        for (metric, column, title, label) in pairs {
            let Some(other) = collection.series(metric).map(|s| s.daily_column(column)) else {
                continue;
            };
            let corr: Vec<_> = rolling_correlation(btc, &other, indicators.correlation_window)
                .into_iter()
                .filter(|(date, _)| window.contains(*date))
                .collect();
            if corr.is_empty() {
                continue;
            }
            correlations.push(MetricPanel {
                metric: format!("btc_{metric}_correlation"),
                title: title.to_string(),
                y_label: Some("Correlation".to_string()),
                y_range: Some((-1.0, 1.0)),
                dates: corr.iter().map(|(date, _)| *date).collect(),
                lines: vec![Line {
                    label: label.to_string(),
                    values: corr.iter().map(|(_, value)| *value).collect(),
                }],
            });
        }
    }

    let mut panels: Vec<MetricPanel> = PANELS
        .iter()
        .filter_map(|def| {
            let series = collection.series(def.metric)?;
            metric_panel(series, &[def.column.to_string()], &window, def.title).map(|mut panel| {
                panel.y_label = def.y_label.map(str::to_string);
                panel.y_range = def.y_range;
                panel
            })
        })
        .collect();

    if let Some(trends) = collection.series(metric_names::GOOGLE_TRENDS) {
        let columns: Vec<String> = trends
            .columns()
            .into_iter()
            .filter(|c| c.ends_with(TREND_SUFFIX))
            .collect();
        if let Some(mut panel) = metric_panel(trends, &columns, &window, "Search Trends") {
            panel.y_range = Some((0.0, 100.0));
            panels.push(panel);
        }
    }

    debug!(
        price = price.is_some(),
        correlations = correlations.len(),
        panels = panels.len(),
        "market report assembled"
    );

    let latest_signal = price.as_ref().and_then(|p| p.signals.last().copied());
    MarketReport {
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        window_start: window.start(),
        window_end: window.end(),
        success_count: collection.success_count(),
        total_count: collection.total_count(),
        price,
        correlations,
        panels,
        latest_signal,
    }
}

/// Indicators run over the full cached history so long windows are warmed up,
/// then the output is clipped to the fetch window.
fn price_panel(
    close_by_date: &BTreeMap<NaiveDate, f64>,
    fear_greed: &BTreeMap<NaiveDate, f64>,
    window: &FetchWindow,
    config: &IndicatorConfig,
    weights: &SignalWeights,
) -> Option<PricePanel> {
    let dates: Vec<NaiveDate> = close_by_date.keys().copied().collect();
    let close: Vec<f64> = close_by_date.values().copied().collect();

    let rsi_values = rsi(&close, config.rsi_periods);
    let averages = moving_averages(&close, &config.ma_periods);
    let macd_values = macd(&close, config.macd_fast, config.macd_slow, config.macd_signal);
    let trend_sma = sma(&close, config.trend_period());
    let sentiment: Vec<Option<f64>> = dates.iter().map(|d| fear_greed.get(d).copied()).collect();
    let signals = market_signals(
        &SignalInputs {
            close: &close,
            rsi: &rsi_values,
            macd_histogram: &macd_values.histogram,
            trend_sma: &trend_sma,
            fear_greed: &sentiment,
        },
        weights,
    );

    let keep: Vec<usize> = dates
        .iter()
        .enumerate()
        .filter(|(_, date)| window.contains(**date))
        .map(|(i, _)| i)
        .collect();
    if keep.is_empty() {
        return None;
    }
    let pick = |values: &[Option<f64>]| -> Vec<Option<f64>> {
        keep.iter().map(|i| values.get(*i).copied().flatten()).collect()
    };
    let pick_defined = |values: &[f64]| -> Vec<Option<f64>> {
        keep.iter().map(|i| values.get(*i).copied()).collect()
    };

    let mut lines = Vec::with_capacity(averages.len() * 2);
    for average in &averages {
        lines.push(Line {
            label: format!("SMA{}", average.period),
            values: pick(&average.sma),
        });
        lines.push(Line {
            label: format!("EMA{}", average.period),
            values: pick_defined(&average.ema),
        });
    }

    Some(PricePanel {
        title: "Bitcoin Price (USD)".to_string(),
        dates: keep.iter().map(|i| dates[*i]).collect(),
        close: keep.iter().map(|i| close[*i]).collect(),
        moving_averages: lines,
        rsi: pick(&rsi_values),
        macd: pick_defined(&macd_values.line),
        macd_signal: pick_defined(&macd_values.signal),
        macd_histogram: pick_defined(&macd_values.histogram),
        signals: keep.iter().map(|i| signals[*i]).collect(),
    })
}

fn metric_panel(
    series: &TimeSeries,
    columns: &[String],
    window: &FetchWindow,
    title: &str,
) -> Option<MetricPanel> {
    let by_column: Vec<(String, BTreeMap<NaiveDate, f64>)> = columns
        .iter()
        .map(|c| {
            let values: BTreeMap<NaiveDate, f64> = series
                .daily_column(c)
                .into_iter()
                .filter(|(date, _)| window.contains(*date))
                .collect();
            (c.clone(), values)
        })
        .filter(|(_, values)| !values.is_empty())
        .collect();
    if by_column.is_empty() {
        return None;
    }

    let dates: BTreeSet<NaiveDate> = by_column
        .iter()
        .flat_map(|(_, values)| values.keys().copied())
        .collect();
    let lines = by_column
        .iter()
        .map(|(label, values)| Line {
            label: label.clone(),
            values: dates.iter().map(|d| values.get(d).copied()).collect(),
        })
        .collect();

    Some(MetricPanel {
        metric: series.name().to_string(),
        title: title.to_string(),
        y_label: None,
        y_range: None,
        dates: dates.into_iter().collect(),
        lines,
    })
}
