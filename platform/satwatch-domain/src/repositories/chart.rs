use crate::entities::market_report::MarketReport;
use std::path::Path;

pub trait ChartWriter {
    fn write_chart(&self, path: &Path, report: &MarketReport) -> Result<(), String>;
}
