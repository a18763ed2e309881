//! Schedule arithmetic for recurring transactions.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::period::{clamp_day, Period};

/// How often a recurring transaction fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Diária",
            Frequency::Weekly => "Semanal",
            Frequency::Monthly => "Mensal",
            Frequency::Yearly => "Anual",
        }
    }

    /// All variants, in display order.
    pub fn all() -> [Frequency; 4] {
        [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Yearly,
        ]
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "diaria" | "diária" => Ok(Frequency::Daily),
            "weekly" | "semanal" => Ok(Frequency::Weekly),
            "monthly" | "mensal" => Ok(Frequency::Monthly),
            "yearly" | "anual" => Ok(Frequency::Yearly),
            other => Err(CoreError::UnknownVariant {
                kind: "frequency",
                value: other.to_string(),
            }),
        }
    }
}

/// The occurrence after `current`.
///
/// `anchor_day` is the day of month the schedule started on; monthly and
/// yearly schedules return to it whenever the target month is long enough,
/// so Jan 31 → Feb 28 → Mar 31.
pub fn next_occurrence(current: NaiveDate, frequency: Frequency, anchor_day: u32) -> NaiveDate {
    match frequency {
        Frequency::Daily => current + Duration::days(1),
        Frequency::Weekly => current + Duration::weeks(1),
        Frequency::Monthly => {
            let next = Period::of(current).next();
            clamp_day(next.year, next.month, anchor_day)
        }
        Frequency::Yearly => clamp_day(current.year() + 1, current.month(), anchor_day),
    }
}

/// Every occurrence from `next_run` up to and including `today`, plus the
/// first occurrence after `today`.
pub fn due_occurrences(
    next_run: NaiveDate,
    frequency: Frequency,
    anchor_day: u32,
    today: NaiveDate,
) -> (Vec<NaiveDate>, NaiveDate) {
    let mut due = Vec::new();
    let mut cursor = next_run;
    while cursor <= today {
        due.push(cursor);
        cursor = next_occurrence(cursor, frequency, anchor_day);
    }
    (due, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!("Semanal".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("hourly".parse::<Frequency>().is_err());
        assert_eq!(Frequency::Yearly.to_string(), "yearly");
    }

    #[test]
    fn test_next_occurrence_simple() {
        assert_eq!(next_occurrence(date(2025, 3, 10), Frequency::Daily, 10), date(2025, 3, 11));
        assert_eq!(next_occurrence(date(2025, 3, 10), Frequency::Weekly, 10), date(2025, 3, 17));
        assert_eq!(next_occurrence(date(2025, 12, 10), Frequency::Monthly, 10), date(2026, 1, 10));
        assert_eq!(next_occurrence(date(2024, 2, 29), Frequency::Yearly, 29), date(2025, 2, 28));
    }

    #[test]
    fn test_monthly_returns_to_anchor_day() {
        let feb = next_occurrence(date(2025, 1, 31), Frequency::Monthly, 31);
        assert_eq!(feb, date(2025, 2, 28));
        let mar = next_occurrence(feb, Frequency::Monthly, 31);
        assert_eq!(mar, date(2025, 3, 31));
    }

    #[test]
    fn test_due_occurrences_catches_up() {
        let (due, next) =
            due_occurrences(date(2025, 1, 5), Frequency::Monthly, 5, date(2025, 3, 20));
        assert_eq!(due, vec![date(2025, 1, 5), date(2025, 2, 5), date(2025, 3, 5)]);
        assert_eq!(next, date(2025, 4, 5));
    }

    #[test]
    fn test_due_occurrences_nothing_due() {
        let (due, next) =
            due_occurrences(date(2025, 5, 1), Frequency::Weekly, 1, date(2025, 4, 30));
        assert!(due.is_empty());
        assert_eq!(next, date(2025, 5, 1));
    }
}
