use chrono::NaiveDate;

pub trait TradingCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOpen;

impl TradingCalendar for AlwaysOpen {
    fn is_trading_day(&self, _date: NaiveDate) -> bool {
        true
    }
}
