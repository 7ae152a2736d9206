//! Month-end projections: weighted moving average, least-squares trend,
//! weekday-adjusted projection and a composite with a confidence band.

use super::forecast::{calculate_std_dev, weekday_buckets};
use crate::utils::{days_in_month, round_half_up, safe_divide, weekday_index};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_WMA_WINDOW: usize = 5;
const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WmaEntry {
    pub day: u32,
    pub actual: f64,
    pub wma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearRegressionResult {
    /// Change in sales per day.
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthEndProjection {
    pub linear_projection: f64,
    pub dow_adjusted_projection: f64,
    pub wma_projection: f64,
    pub confidence_interval: ConfidenceInterval,
    pub daily_trend: f64,
    pub regression_projection: f64,
}

fn selling_days(daily_sales: &BTreeMap<u32, f64>) -> Vec<(u32, f64)> {
    daily_sales
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(d, v)| (*d, *v))
        .collect()
}

/// Weighted moving average over selling days, weights `1..=window` with the
/// most recent day heaviest. Entries before the window fills keep their
/// actual value; with fewer selling days than the window, every entry does.
pub fn calculate_wma(daily_sales: &BTreeMap<u32, f64>, window: usize) -> Vec<WmaEntry> {
    let entries = selling_days(daily_sales);
    let passthrough = |(day, actual): (u32, f64)| WmaEntry {
        day,
        actual,
        wma: actual,
    };

    if window == 0 || entries.len() < window {
        return entries.into_iter().map(passthrough).collect();
    }

    let total_weight = (window * (window + 1)) as f64 / 2.0;
    entries
        .iter()
        .enumerate()
        .map(|(i, &(day, actual))| {
            if i + 1 < window {
                return passthrough((day, actual));
            }
            let weighted_sum: f64 = entries[i + 1 - window..=i]
                .iter()
                .enumerate()
                .map(|(j, (_, v))| v * (j + 1) as f64)
                .sum();
            WmaEntry {
                day,
                actual,
                wma: weighted_sum / total_weight,
            }
        })
        .collect()
}

/// Ordinary least squares of sales on day number, over selling days.
pub fn linear_regression(daily_sales: &BTreeMap<u32, f64>) -> LinearRegressionResult {
    let entries = selling_days(daily_sales);
    if entries.len() < 2 {
        return LinearRegressionResult::default();
    }

    let n = entries.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for &(day, y) in &entries {
        let x = day as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return LinearRegressionResult {
            slope: 0.0,
            intercept: sum_y / n,
            r_squared: 0.0,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let y_mean = sum_y / n;
    let (ss_tot, ss_res) = entries.iter().fold((0.0, 0.0), |(tot, res), &(day, y)| {
        let fitted = slope * day as f64 + intercept;
        (tot + (y - y_mean).powi(2), res + (y - fitted).powi(2))
    });

    LinearRegressionResult {
        slope,
        intercept,
        r_squared: if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot },
    }
}

/// Actual sales to date plus the weekday average for each day after
/// `data_end_day`.
pub fn project_dow_adjusted(
    year: i32,
    month: u32,
    daily_sales: &BTreeMap<u32, f64>,
    data_end_day: u32,
) -> f64 {
    let averages = weekday_buckets(year, month, daily_sales)
        .map(|(total, count)| safe_divide(total, count as f64, 0.0));
    let actual_total: f64 = daily_sales.values().sum();

    let remaining: f64 = (data_end_day + 1..=days_in_month(year, month))
        .filter_map(|d| weekday_index(year, month, d))
        .map(|dow| averages[dow])
        .sum();

    actual_total + remaining
}

/// Runs every projection method over the month's selling days. All figures
/// are rounded to whole currency units.
pub fn calculate_month_end_projection(
    year: i32,
    month: u32,
    daily_sales: &BTreeMap<u32, f64>,
) -> MonthEndProjection {
    let entries = selling_days(daily_sales);
    let Some(data_end_day) = entries.iter().map(|(d, _)| *d).max() else {
        return MonthEndProjection::default();
    };

    let values: Vec<f64> = entries.iter().map(|(_, v)| *v).collect();
    let n = values.len() as f64;
    let actual_total: f64 = values.iter().sum();
    let remaining_days = days_in_month(year, month).saturating_sub(data_end_day) as f64;

    let daily_avg = actual_total / n;
    let linear = actual_total + daily_avg * remaining_days;

    let dow_adjusted = project_dow_adjusted(year, month, daily_sales, data_end_day);

    let last_wma = calculate_wma(daily_sales, DEFAULT_WMA_WINDOW)
        .last()
        .map_or(daily_avg, |e| e.wma);
    let wma = actual_total + last_wma * remaining_days;

    let regression = linear_regression(daily_sales);
    let regression_projection = actual_total
        + (data_end_day + 1..=days_in_month(year, month))
            .map(|d| (regression.slope * d as f64 + regression.intercept).max(0.0))
            .sum::<f64>();

    let (_, std_dev) = calculate_std_dev(&values);
    let uncertainty = Z_95 * (std_dev / n.sqrt()) * remaining_days;
    let best_estimate = (linear + dow_adjusted + wma) / 3.0;

    MonthEndProjection {
        linear_projection: round_half_up(linear),
        dow_adjusted_projection: round_half_up(dow_adjusted),
        wma_projection: round_half_up(wma),
        confidence_interval: ConfidenceInterval {
            lower: round_half_up((best_estimate - uncertainty).max(0.0)),
            upper: round_half_up(best_estimate + uncertainty),
        },
        daily_trend: round_half_up(regression.slope),
        regression_projection: round_half_up(regression_projection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(u32, f64)]) -> BTreeMap<u32, f64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_wma_window_three() {
        let daily = series(&[(1, 100.0), (2, 200.0), (3, 300.0), (4, 400.0)]);
        let wma = calculate_wma(&daily, 3);
        assert_eq!(wma.len(), 4);
        assert_eq!(wma[0].wma, 100.0);
        assert_eq!(wma[1].wma, 200.0);
        assert!((wma[2].wma - 1400.0 / 6.0).abs() < 1e-9);
        assert!((wma[3].wma - 2000.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_wma_short_series_passes_through() {
        let daily = series(&[(1, 100.0), (2, 0.0), (3, 300.0)]);
        let wma = calculate_wma(&daily, DEFAULT_WMA_WINDOW);
        assert_eq!(wma.len(), 2);
        assert!(wma.iter().all(|e| e.wma == e.actual));
    }

    #[test]
    fn test_linear_regression_exact_line() {
        let daily: BTreeMap<u32, f64> = (1..=5).map(|d| (d, 100.0 * d as f64 + 500.0)).collect();
        let reg = linear_regression(&daily);
        assert!((reg.slope - 100.0).abs() < 1e-6);
        assert!((reg.intercept - 500.0).abs() < 1e-6);
        assert!((reg.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regression_degenerate() {
        assert_eq!(linear_regression(&BTreeMap::new()), LinearRegressionResult::default());
        let single = series(&[(3, 100.0)]);
        assert_eq!(linear_regression(&single), LinearRegressionResult::default());
    }

    #[test]
    fn test_dow_adjusted_projection() {
        // February 2026 starts on a Sunday; one week of data
        let daily: BTreeMap<u32, f64> = (1..=7).map(|d| (d, d as f64 * 10.0)).collect();
        let projection = project_dow_adjusted(2026, 2, &daily, 7);
        // three more full weeks follow
        assert!((projection - 280.0 * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_month_end_projection_flat_sales() {
        let daily: BTreeMap<u32, f64> = (1..=14).map(|d| (d, 1000.0)).collect();
        let projection = calculate_month_end_projection(2026, 2, &daily);
        assert_eq!(projection.linear_projection, 28_000.0);
        assert_eq!(projection.dow_adjusted_projection, 28_000.0);
        assert_eq!(projection.wma_projection, 28_000.0);
        assert_eq!(projection.regression_projection, 28_000.0);
        assert_eq!(projection.daily_trend, 0.0);
        assert_eq!(projection.confidence_interval.lower, 28_000.0);
        assert_eq!(projection.confidence_interval.upper, 28_000.0);
    }

    #[test]
    fn test_month_end_projection_band_and_empty() {
        let daily = series(&[(1, 500.0), (2, 1500.0), (3, 800.0), (4, 1200.0)]);
        let projection = calculate_month_end_projection(2026, 2, &daily);
        assert!(projection.confidence_interval.lower <= projection.confidence_interval.upper);
        assert!(projection.confidence_interval.lower >= 0.0);

        assert_eq!(
            calculate_month_end_projection(2026, 2, &BTreeMap::new()),
            MonthEndProjection::default()
        );
    }
}
