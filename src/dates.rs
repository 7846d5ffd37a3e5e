use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A day-month pair with an optional year, as entered by the user.
///
/// Without a year there is no way to tell whether Feb 29 is real, so it
/// is always accepted year-less; with a year the Gregorian leap rule
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthdayDate {
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    /// Wrong shape: callers answer with a usage message.
    #[error("malformed date, expected DD.MM or DD.MM.YYYY")]
    Syntax,
    /// Right shape, impossible calendar date.
    #[error("invalid calendar date")]
    Invalid,
}

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})\.(\d{2})(?:\.(\d{4}))?$").expect("date regex"));

/// Parse `DD.MM` or `DD.MM.YYYY` with exact field widths.
pub fn parse(text: &str) -> Result<BirthdayDate, DateError> {
    let caps = DATE_RE.captures(text).ok_or(DateError::Syntax)?;
    let day: u32 = caps[1].parse().map_err(|_| DateError::Syntax)?;
    let month: u32 = caps[2].parse().map_err(|_| DateError::Syntax)?;
    let year: Option<i32> = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().map_err(|_| DateError::Syntax)?),
        None => None,
    };

    if !is_valid_date(year, month, day) {
        return Err(DateError::Invalid);
    }
    Ok(BirthdayDate { day, month, year })
}

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(month: u32, year: Option<i32>) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => match year {
            Some(y) if !is_leap_year(y) => 28,
            _ => 29,
        },
        _ => 0,
    }
}

pub fn is_valid_date(year: Option<i32>, month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(month, year)
}

// Cumulative day counts for a 366-slot year (February holds 29 slots,
// so Feb 29 has a position of its own).
const CUMULATIVE_DAYS: [u32; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Position of a month/day pair in the 366-slot circular year, 0-based.
pub fn ordinal366(month: u32, day: u32) -> u32 {
    CUMULATIVE_DAYS[(month - 1) as usize] + day - 1
}

/// Forward distance in circular-year slots from `today` to the given
/// month/day. 0 means today; year-end wraps around to year-start.
pub fn days_until(today: NaiveDate, month: u32, day: u32) -> u32 {
    (ordinal366(month, day) + 366 - ordinal366(today.month(), today.day())) % 366
}

/// The date this birthday falls on in `year`. Feb 29 birthdays fall
/// back to Feb 28 in non-leap years so they still fire once a year.
pub fn occurrence_in_year(month: u32, day: u32, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        if month == 2 && day == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

/// `DD.MM` rendering used in messages and button titles.
pub fn format_day_month(day: u32, month: u32) -> String {
    format!("{:02}.{:02}", day, month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_month() {
        assert_eq!(
            parse("01.02"),
            Ok(BirthdayDate {
                day: 1,
                month: 2,
                year: None
            })
        );
        assert_eq!(
            parse("31.12"),
            Ok(BirthdayDate {
                day: 31,
                month: 12,
                year: None
            })
        );
    }

    #[test]
    fn parses_day_month_year() {
        assert_eq!(
            parse("01.02.2003"),
            Ok(BirthdayDate {
                day: 1,
                month: 2,
                year: Some(2003)
            })
        );
    }

    #[test]
    fn rejects_wrong_field_widths_as_syntax() {
        for input in [
            "1.02",
            "01.2",
            "001.02",
            "01.002",
            "01.02.23",
            "01.02.20233",
            "01-02",
            "01.02.",
            "",
            "abcde",
            "01.02 2003",
        ] {
            assert_eq!(parse(input), Err(DateError::Syntax), "input: {input:?}");
        }
    }

    #[test]
    fn rejects_impossible_dates_as_invalid() {
        for input in ["31.09", "00.01", "01.00", "13.13", "32.01", "31.04", "30.02"] {
            assert_eq!(parse(input), Err(DateError::Invalid), "input: {input:?}");
        }
    }

    #[test]
    fn leap_day_rules() {
        // No year to disambiguate, so yearless Feb 29 is accepted.
        assert!(parse("29.02").is_ok());
        assert!(parse("29.02.2024").is_ok());
        assert!(parse("29.02.2000").is_ok());
        assert_eq!(parse("29.02.2023"), Err(DateError::Invalid));
        assert_eq!(parse("29.02.1900"), Err(DateError::Invalid));
    }

    #[test]
    fn leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn ordinal_gives_leap_day_its_own_slot() {
        assert_eq!(ordinal366(1, 1), 0);
        assert_eq!(ordinal366(2, 28), 58);
        assert_eq!(ordinal366(2, 29), 59);
        assert_eq!(ordinal366(3, 1), 60);
        assert_eq!(ordinal366(12, 31), 365);
    }

    #[test]
    fn distance_wraps_at_year_end() {
        let dec31 = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(days_until(dec31, 12, 31), 0);
        assert_eq!(days_until(dec31, 1, 1), 1);

        let mar15 = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        assert_eq!(days_until(mar15, 3, 15), 0);
        assert_eq!(days_until(mar15, 3, 16), 1);
        assert!(days_until(mar15, 3, 14) > days_until(mar15, 12, 31));
    }

    #[test]
    fn occurrence_falls_back_to_feb_28() {
        assert_eq!(
            occurrence_in_year(2, 29, 2023),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
        assert_eq!(
            occurrence_in_year(2, 29, 2024),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            occurrence_in_year(3, 15, 2023),
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
    }

    #[test]
    fn formats_day_month_zero_padded() {
        assert_eq!(format_day_month(1, 2), "01.02");
        assert_eq!(format_day_month(14, 3), "14.03");
    }
}
