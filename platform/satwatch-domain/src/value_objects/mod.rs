pub mod date_range;
pub mod fetch_window;
pub mod lookback;
pub mod record;
pub mod source_spec;
