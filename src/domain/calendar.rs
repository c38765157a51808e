//! Trading-day calendar: market open/close and holiday-aware day stepping.
//!
//! Timestamps throughout this crate are market-local wall-clock, encoded as
//! naive (offset-free) chrono types. The broker feed and stores are expected
//! to agree on this convention; no timezone conversion happens inside the
//! core (spec.md §3, Candle.timestamp).

use crate::domain::errors::CalendarRangeError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashSet;

fn market_open_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).expect("09:15:00 is always a valid time")
}

fn market_close_time() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).expect("15:30:00 is always a valid time")
}

/// Decides whether a date is a trading day and steps forward/back across
/// weekends and an injected holiday set.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    holidays: HashSet<NaiveDate>,
    /// Earliest date this calendar is willing to vouch for. Stepping
    /// further back than this fails with `CalendarRangeError`.
    earliest_known: NaiveDate,
}

impl TradingCalendar {
    pub fn new(holidays: HashSet<NaiveDate>, earliest_known: NaiveDate) -> Self {
        Self {
            holidays,
            earliest_known,
        }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.succ_opt().expect("NaiveDate does not overflow in practice");
        while !self.is_trading_day(cursor) {
            cursor = cursor.succ_opt().expect("NaiveDate does not overflow in practice");
        }
        cursor
    }

    pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.pred_opt().expect("NaiveDate does not underflow in practice");
        while !self.is_trading_day(cursor) {
            cursor = cursor.pred_opt().expect("NaiveDate does not underflow in practice");
        }
        cursor
    }

    pub fn subtract_trading_days(
        &self,
        date: NaiveDate,
        n: u32,
    ) -> Result<NaiveDate, CalendarRangeError> {
        let mut cursor = date;
        for _ in 0..n {
            if cursor <= self.earliest_known {
                return Err(CalendarRangeError::InsufficientHistory { from: date, steps: n });
            }
            cursor = self.previous_trading_day(cursor);
        }
        Ok(cursor)
    }

    pub fn market_open(&self, date: NaiveDate) -> NaiveDateTime {
        NaiveDateTime::new(date, market_open_time())
    }

    pub fn market_close(&self, date: NaiveDate) -> NaiveDateTime {
        NaiveDateTime::new(date, market_close_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> TradingCalendar {
        let mut holidays = HashSet::new();
        holidays.insert(NaiveDate::from_ymd_opt(2025, 1, 26).unwrap()); // Republic Day
        TradingCalendar::new(holidays, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
    }

    #[test]
    fn weekend_is_not_a_trading_day() {
        let cal = calendar();
        // 2025-01-25 is a Saturday
        assert!(!cal.is_trading_day(NaiveDate::from_ymd_opt(2025, 1, 25).unwrap()));
    }

    #[test]
    fn holiday_is_not_a_trading_day() {
        let cal = calendar();
        assert!(!cal.is_trading_day(NaiveDate::from_ymd_opt(2025, 1, 26).unwrap()));
    }

    #[test]
    fn next_trading_day_skips_weekend_and_holiday() {
        let cal = calendar();
        // Friday 2025-01-24 is a trading day (Jan 25/26 are weekend/holiday)
        let next = cal.next_trading_day(NaiveDate::from_ymd_opt(2025, 1, 24).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
    }

    #[test]
    fn previous_trading_day_skips_weekend() {
        let cal = calendar();
        // Monday 2025-01-27 -> previous trading day skips the holiday and weekend
        let prev = cal.previous_trading_day(NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());
        assert_eq!(prev, NaiveDate::from_ymd_opt(2025, 1, 24).unwrap());
    }

    #[test]
    fn subtract_trading_days_walks_back_n_sessions() {
        let cal = calendar();
        let d = cal
            .subtract_trading_days(NaiveDate::from_ymd_opt(2025, 1, 27).unwrap(), 1)
            .unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 1, 24).unwrap());
    }

    #[test]
    fn subtract_trading_days_fails_beyond_known_history() {
        let mut holidays = HashSet::new();
        holidays.clear();
        let cal = TradingCalendar::new(holidays, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        let err = cal
            .subtract_trading_days(NaiveDate::from_ymd_opt(2025, 1, 21).unwrap(), 5)
            .unwrap_err();
        assert!(matches!(err, CalendarRangeError::InsufficientHistory { .. }));
    }

    #[test]
    fn market_open_and_close_are_09_15_and_15_30() {
        let cal = calendar();
        let date = NaiveDate::from_ymd_opt(2025, 1, 24).unwrap();
        assert_eq!(cal.market_open(date).time(), market_open_time());
        assert_eq!(cal.market_close(date).time(), market_close_time());
    }
}
