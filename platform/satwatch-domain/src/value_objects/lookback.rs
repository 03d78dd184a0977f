use chrono::{Days, Months, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Months(u32),
}

impl Lookback {
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim().to_lowercase();
        if trimmed.len() < 2 {
            return Err(format!("invalid lookback: {value}"));
        }
        let (number, unit) = trimmed.split_at(trimmed.len() - 1);
        let amount: u32 = number
            .parse()
            .map_err(|_| format!("invalid lookback amount: {value}"))?;
        if amount == 0 {
            return Err(format!("lookback must be positive: {value}"));
        }
        let scaled = |factor: u32| {
            amount
                .checked_mul(factor)
                .ok_or_else(|| format!("lookback is too large: {value}"))
        };
        match unit {
            "d" => Ok(Lookback::Days(amount)),
            "w" => scaled(7).map(Lookback::Days),
            "m" => Ok(Lookback::Months(amount)),
            "y" => scaled(12).map(Lookback::Months),
            _ => Err(format!("unsupported lookback unit in {value} (expected d|w|m|y)")),
        }
    }

    pub fn start_from(&self, end: NaiveDate) -> Result<NaiveDate, String> {
        let start = match *self {
            Lookback::Days(days) => end.checked_sub_days(Days::new(days as u64)),
            Lookback::Months(months) => end.checked_sub_months(Months::new(months)),
        };
        start.ok_or_else(|| format!("lookback {self} underflows from {end}"))
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Months(12)
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Days(days) => write!(f, "{days}d"),
            Lookback::Months(months) if months % 12 == 0 => write!(f, "{}y", months / 12),
            Lookback::Months(months) => write!(f, "{months}m"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Lookback;
    use chrono::NaiveDate;

    #[test]
    fn parses_units() {
        assert_eq!(Lookback::parse("1y").unwrap(), Lookback::Months(12));
        assert_eq!(Lookback::parse("6m").unwrap(), Lookback::Months(6));
        assert_eq!(Lookback::parse("90d").unwrap(), Lookback::Days(90));
        assert_eq!(Lookback::parse("2w").unwrap(), Lookback::Days(14));
        assert!(Lookback::parse("0d").is_err());
        assert!(Lookback::parse("1x").is_err());
        assert!(Lookback::parse("y").is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let err = Lookback::parse("400000000y").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert!(Lookback::parse("700000000w").is_err());

        let days = Lookback::parse("4000000000d").expect("fits in u32");
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(days.start_from(end).is_err());
    }

    #[test]
    fn one_year_uses_calendar_months() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let start = Lookback::Months(12).start_from(end).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for raw in ["1y", "6m", "45d"] {
            let parsed = Lookback::parse(raw).unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }
}
