pub mod market_report;
pub mod time_series;
