//! Month/year periods.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Portuguese month names, indexed by `month - 1`.
pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Years accepted from user input.
pub const YEAR_RANGE: RangeInclusive<i32> = 1900..=9999;

/// Reject years outside [`YEAR_RANGE`].
pub fn check_year(year: i32) -> Result<i32> {
    if YEAR_RANGE.contains(&year) {
        Ok(year)
    } else {
        Err(CoreError::InvalidYear(year))
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Create a period, validating the month and the year.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonth(month));
        }
        Ok(Self {
            year: check_year(year)?,
            month,
        })
    }

    /// The period a date falls in.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the period.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following period (exclusive end bound).
    pub fn end_exclusive(&self) -> NaiveDate {
        self.next().first_day()
    }

    /// The following month.
    pub fn next(&self) -> Self {
        self.add_months(1)
    }

    /// The preceding month.
    pub fn prev(&self) -> Self {
        self.add_months(-1)
    }

    /// Shift by a signed number of months.
    ///
    /// Saturates at the first and last months an `i32` year can hold.
    pub fn add_months(&self, months: i32) -> Self {
        let index =
            i64::from(self.year) * 12 + i64::from(self.month) - 1 + i64::from(months);
        match i32::try_from(index.div_euclid(12)) {
            Ok(year) => Self {
                year,
                month: index.rem_euclid(12) as u32 + 1,
            },
            Err(_) if months < 0 => Self {
                year: i32::MIN,
                month: 1,
            },
            Err(_) => Self {
                year: i32::MAX,
                month: 12,
            },
        }
    }

    /// Portuguese month name.
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// Label like `Março/2025`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.month_name(), self.year)
    }

    /// All twelve periods of a year.
    pub fn year_months(year: i32) -> impl Iterator<Item = Period> {
        (1..=12).map(move |month| Period { year, month })
    }

    /// The twelve months before this one, as a `[start, end)` date range.
    pub fn trailing_twelve(&self) -> (NaiveDate, NaiveDate) {
        (self.add_months(-12).first_day(), self.first_day())
    }
}

/// Whole calendar months from `start` to `now`.
///
/// Counts month boundaries crossed, minus one when the day of month in `now`
/// has not yet reached the start day. Negative spans clamp to zero.
pub fn months_between(start: NaiveDate, now: NaiveDate) -> u32 {
    let mut months =
        (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32;
    if now.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Clamp a day-of-month to the last valid day of the given month.
pub fn clamp_day(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut day = day.clamp(1, 31);
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
        day -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_navigation() {
        let p = Period::new(2025, 12).unwrap();
        assert_eq!(p.next(), Period::new(2026, 1).unwrap());
        assert_eq!(Period::new(2025, 1).unwrap().prev(), Period::new(2024, 12).unwrap());
        assert_eq!(p.add_months(-12), Period::new(2024, 12).unwrap());
        assert_eq!(p.add_months(14), Period::new(2027, 2).unwrap());
        assert!(Period::new(2025, 13).is_err());
        assert!(Period::new(2025, 0).is_err());
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(check_year(2025), Ok(2025));
        assert_eq!(check_year(200_000_000), Err(CoreError::InvalidYear(200_000_000)));
        assert!(Period::new(1899, 1).is_err());
        assert!(Period::new(10_000, 1).is_err());

        let last = Period {
            year: i32::MAX,
            month: 12,
        };
        assert_eq!(last.next(), last);
        assert_eq!(last.add_months(-1).month, 11);
        assert_eq!(last.add_months(-1).year, i32::MAX);
        let first = Period {
            year: i32::MIN,
            month: 1,
        };
        assert_eq!(first.prev(), first);
        assert_eq!(first.add_months(-24), first);
    }

    #[test]
    fn test_trailing_twelve() {
        let (start, end) = Period::new(2025, 3).unwrap().trailing_twelve();
        assert_eq!(start, date(2024, 3, 1));
        assert_eq!(end, date(2025, 3, 1));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2025, 1, 10), date(2025, 1, 31)), 0);
        assert_eq!(months_between(date(2025, 1, 10), date(2025, 2, 9)), 0);
        assert_eq!(months_between(date(2025, 1, 10), date(2025, 2, 10)), 1);
        assert_eq!(months_between(date(2024, 11, 1), date(2025, 2, 1)), 3);
        assert_eq!(months_between(date(2025, 6, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn test_clamp_day() {
        assert_eq!(clamp_day(2025, 2, 31), date(2025, 2, 28));
        assert_eq!(clamp_day(2024, 2, 30), date(2024, 2, 29));
        assert_eq!(clamp_day(2025, 4, 31), date(2025, 4, 30));
        assert_eq!(clamp_day(2025, 5, 15), date(2025, 5, 15));
    }

    #[test]
    fn test_year_months_has_twelve() {
        let months: Vec<_> = Period::year_months(2025).collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].month_name(), "Janeiro");
        assert_eq!(months[11].label(), "Dezembro/2025");
    }
}
