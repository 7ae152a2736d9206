//! Cell-to-date interpretation for the back-office exports.
//!
//! Exports mix spreadsheet serial numbers with several text conventions,
//! including Japanese era years (`令和8年2月1日`, `R8.2.1`). Every parser in
//! here returns `None` for calendar-invalid input instead of rolling over.

use crate::schema::Cell;
use crate::utils::parse_number_text;
use chrono::{Datelike, Days, Local, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;
/// Serial number of 1970-01-01.
const EXCEL_UNIX_EPOCH: f64 = 25_569.0;
const SERIAL_TEXT_MIN: f64 = 30_000.0;
const SERIAL_TEXT_MAX: f64 = 100_000.0;

static ERA_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(令和|平成|昭和|R|H|S)\s*(元|\d{1,2})\s*[年./\-]\s*(\d{1,2})\s*[月./\-]\s*(\d{1,2})")
        .expect("Invalid regex")
});
static JAPANESE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("Invalid regex"));
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("Invalid regex"));
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").expect("Invalid regex"));
static DOT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\.(\d{1,2})\.(\d{1,2})").expect("Invalid regex"));
static SHORT_YEAR_SLASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})/(\d{1,2})/(\d{1,2})(?:\s*\(.+\))?$").expect("Invalid regex")
});
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})(?:\s*\(.+\))?$").expect("Invalid regex")
});

/// Interprets a cell as a calendar date.
///
/// `context_year` only matters for bare `MM/DD` text; without it the current
/// local year is used.
pub fn parse_date(cell: &Cell, context_year: Option<i32>) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Date(date) => Some(*date),
        Cell::Number(serial) => {
            if !(1.0..=EXCEL_SERIAL_MAX).contains(serial) {
                return None;
            }
            from_excel_serial(*serial)
        }
        Cell::Text(text) => parse_date_text(text.trim(), context_year),
    }
}

/// Day-of-month component of [`parse_date`].
pub fn day_of_month(cell: &Cell, context_year: Option<i32>) -> Option<u32> {
    parse_date(cell, context_year).map(|d| d.day())
}

/// Converts a spreadsheet serial to a calendar date, ignoring time-of-day.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    let offset = (serial - EXCEL_UNIX_EPOCH).floor();
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if offset >= 0.0 {
        epoch.checked_add_days(Days::new(offset as u64))
    } else {
        epoch.checked_sub_days(Days::new((-offset) as u64))
    }
}

fn parse_date_text(text: &str, context_year: Option<i32>) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    if let Some(n) = parse_number_text(text) {
        if n > SERIAL_TEXT_MIN && n < SERIAL_TEXT_MAX {
            return from_excel_serial(n);
        }
    }

    if let Some(caps) = ERA_DATE_RE.captures(text) {
        let base = era_base_year(&caps[1])?;
        let era_year = if &caps[2] == "元" {
            1
        } else {
            caps[2].parse::<i32>().ok()?
        };
        return ymd(base + era_year, &caps[3], &caps[4]);
    }

    for re in [&JAPANESE_DATE_RE, &ISO_DATE_RE, &SLASH_DATE_RE, &DOT_DATE_RE] {
        if let Some(caps) = re.captures(text) {
            let year = caps[1].parse::<i32>().ok()?;
            return ymd(year, &caps[2], &caps[3]);
        }
    }

    if let Some(caps) = SHORT_YEAR_SLASH_RE.captures(text) {
        let short = caps[1].parse::<i32>().ok()?;
        let year = if short < 50 { 2000 + short } else { 1900 + short };
        return ymd(year, &caps[2], &caps[3]);
    }

    if let Some(caps) = MONTH_DAY_RE.captures(text) {
        let year = context_year.unwrap_or_else(|| Local::now().year());
        return ymd(year, &caps[1], &caps[2]);
    }

    None
}

fn era_base_year(era: &str) -> Option<i32> {
    match era {
        "令和" | "R" => Some(2018),
        "平成" | "H" => Some(1988),
        "昭和" | "S" => Some(1925),
        _ => None,
    }
}

fn ymd(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    let month = month.parse::<u32>().ok()?;
    let day = day.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_excel_serial_numbers() {
        // 46054 = 2026-02-01
        assert_eq!(parse_date(&Cell::Number(46054.0), None), date(2026, 2, 1));
        assert_eq!(parse_date(&Cell::Number(46054.75), None), date(2026, 2, 1));
        assert_eq!(parse_date(&Cell::Number(25569.0), None), date(1970, 1, 1));
        assert_eq!(parse_date(&Cell::Number(0.0), None), None);
        assert_eq!(parse_date(&Cell::Number(3_000_000.0), None), None);
    }

    #[test]
    fn test_numeric_text_serial_range() {
        assert_eq!(parse_date(&Cell::from("46054"), None), date(2026, 2, 1));
        assert_eq!(parse_date(&Cell::from("29999"), None), None);
        assert_eq!(parse_date(&Cell::from("15"), None), None);
    }

    #[test]
    fn test_text_formats() {
        let expected = date(2026, 2, 15);
        assert_eq!(parse_date(&Cell::from("2026年2月15日"), None), expected);
        assert_eq!(parse_date(&Cell::from("2026年02月15日(日)"), None), expected);
        assert_eq!(parse_date(&Cell::from("2026-02-15"), None), expected);
        assert_eq!(parse_date(&Cell::from("2026/2/15"), None), expected);
        assert_eq!(parse_date(&Cell::from("2026.02.15"), None), expected);
        assert_eq!(parse_date(&Cell::from(" 2026-02-15 10:30 "), None), expected);
    }

    #[test]
    fn test_era_dates() {
        assert_eq!(parse_date(&Cell::from("令和8年2月1日"), None), date(2026, 2, 1));
        assert_eq!(parse_date(&Cell::from("R8.2.1"), None), date(2026, 2, 1));
        assert_eq!(parse_date(&Cell::from("平成31年4月30日"), None), date(2019, 4, 30));
        assert_eq!(parse_date(&Cell::from("令和元年5月1日"), None), date(2019, 5, 1));
        assert_eq!(parse_date(&Cell::from("S64/1/7"), None), date(1989, 1, 7));
    }

    #[test]
    fn test_two_digit_years_pivot_at_fifty() {
        assert_eq!(parse_date(&Cell::from("26/02/15"), None), date(2026, 2, 15));
        assert_eq!(parse_date(&Cell::from("49/01/01"), None), date(2049, 1, 1));
        assert_eq!(parse_date(&Cell::from("50/01/01"), None), date(1950, 1, 1));
        assert_eq!(parse_date(&Cell::from("99/12/31"), None), date(1999, 12, 31));
    }

    #[test]
    fn test_month_day_uses_context_year() {
        assert_eq!(parse_date(&Cell::from("02/15"), Some(2025)), date(2025, 2, 15));
        assert_eq!(parse_date(&Cell::from("2/29"), Some(2024)), date(2024, 2, 29));
        assert_eq!(parse_date(&Cell::from("2/29"), Some(2025)), None);

        let current = Local::now().year();
        assert_eq!(parse_date(&Cell::from("3/1"), None), date(current, 3, 1));
    }

    #[test]
    fn test_invalid_calendar_dates_return_none() {
        assert_eq!(parse_date(&Cell::from("2026年2月30日"), None), None);
        assert_eq!(parse_date(&Cell::from("2026-13-01"), None), None);
        assert_eq!(parse_date(&Cell::from("合計"), None), None);
        assert_eq!(parse_date(&Cell::from(""), None), None);
        assert_eq!(parse_date(&Cell::Empty, None), None);
    }

    #[test]
    fn test_date_cells_pass_through() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(parse_date(&Cell::Date(d), None), Some(d));
        assert_eq!(day_of_month(&Cell::Date(d), None), Some(3));
        assert_eq!(day_of_month(&Cell::from("2026/02/28"), None), Some(28));
        assert_eq!(day_of_month(&Cell::from("n/a"), None), None);
    }
}
