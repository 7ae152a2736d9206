use crate::schema::Cell;
use chrono::{Datelike, NaiveDate};

/// Numeric value of a cell; anything unparsable becomes 0.
pub fn safe_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => parse_number_text(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parses `"1,234.5"` style text. `None` for empty or non-numeric input.
pub fn parse_number_text(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn safe_divide(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        fallback
    }
}

/// Rounds halves toward positive infinity, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Calendar length of the month, 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    if !(1..=12).contains(&month) {
        return 0;
    }
    last_day_of_month(year, month).map_or(0, |d| d.day())
}

/// Weekday with Sunday = 0 through Saturday = 6.
pub fn weekday_index(year: i32, month: u32, day: u32) -> Option<usize> {
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.weekday().num_days_from_sunday() as usize)
}

/// Store id for a zero-padded store code: `"0012"` becomes `"12"`.
pub fn store_id_from_code(code: &str) -> String {
    let trimmed = code.trim().trim_start_matches('0');
    if trimmed.is_empty() && !code.trim().is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Store id from the leading digits of a code cell (`"0003:店舗C"`, `"3"`, `3`).
/// `None` when the text does not start with a digit.
pub fn store_id_from_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(store_id_from_code(&digits))
    }
}

/// Last path component of a filename, accepting both separators.
pub fn basename(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}
