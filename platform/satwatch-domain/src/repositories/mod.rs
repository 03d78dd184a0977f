pub mod calendar;
pub mod chart;
pub mod metric_source;
pub mod series_store;
