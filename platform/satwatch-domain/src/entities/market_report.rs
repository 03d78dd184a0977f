use crate::services::signal::SignalClass;
use chrono::NaiveDate;
use serde::Serialize;

/// Everything the dashboard renderer needs, derived from one collection run.
#[derive(Debug, Clone, Serialize)]
pub struct MarketReport {
    pub generated_at: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub success_count: usize,
    pub total_count: usize,
    pub price: Option<PricePanel>,
    pub correlations: Vec<MetricPanel>,
    pub panels: Vec<MetricPanel>,
    pub latest_signal: Option<SignalClass>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePanel {
    pub title: String,
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub moving_averages: Vec<Line>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_histogram: Vec<Option<f64>>,
    pub signals: Vec<SignalClass>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// One chart cell; every line shares the panel's date axis.
#[derive(Debug, Clone, Serialize)]
pub struct MetricPanel {
    pub metric: String,
    pub title: String,
    pub y_label: Option<String>,
    pub y_range: Option<(f64, f64)>,
    pub dates: Vec<NaiveDate>,
    pub lines: Vec<Line>,
}
