use crate::entities::time_series::TimeSeries;

pub trait SeriesStore {
    /// Returns `None` when nothing usable is persisted, including unreadable or malformed files.
    fn load(&self, name: &str) -> Option<TimeSeries>;
    fn save(&self, series: &TimeSeries) -> Result<(), String>;
}
