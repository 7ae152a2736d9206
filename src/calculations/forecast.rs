use crate::utils::{days_in_month, safe_divide, weekday_index};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    /// 1-based.
    pub week_number: u32,
    pub start_day: u32,
    pub end_day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_number: u32,
    pub start_day: u32,
    pub end_day: u32,
    pub total_sales: f64,
    pub total_gross_profit: f64,
    pub gross_profit_rate: f64,
    /// Selling days in the week.
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayOfWeekAverage {
    /// 0 = Sunday.
    pub day_of_week: usize,
    pub average_sales: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetectionResult {
    pub day: u32,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastInput {
    pub year: i32,
    pub month: u32,
    pub daily_sales: BTreeMap<u32, f64>,
    pub daily_gross_profit: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastResult {
    pub weekly_summaries: Vec<WeeklySummary>,
    pub day_of_week_averages: Vec<DayOfWeekAverage>,
    pub anomalies: Vec<AnomalyDetectionResult>,
}

/// Population mean and standard deviation. `(0, 0)` for no values.
pub fn calculate_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Monday-to-Sunday weeks of the month; the first and last weeks are cut at
/// the month boundaries.
pub fn week_ranges(year: i32, month: u32) -> Vec<WeekRange> {
    let last = days_in_month(year, month);
    let mut weeks = Vec::new();
    let mut day = 1;

    while day <= last {
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            break;
        };
        let days_until_sunday = 6 - date.weekday().num_days_from_monday();
        let end_day = (day + days_until_sunday).min(last);
        weeks.push(WeekRange {
            week_number: weeks.len() as u32 + 1,
            start_day: day,
            end_day,
        });
        day = end_day + 1;
    }
    weeks
}

pub fn calculate_weekly_summaries(input: &ForecastInput) -> Vec<WeeklySummary> {
    week_ranges(input.year, input.month)
        .into_iter()
        .map(|week| {
            let mut total_sales = 0.0;
            let mut total_gross_profit = 0.0;
            let mut days = 0;
            for d in week.start_day..=week.end_day {
                let sales = input.daily_sales.get(&d).copied().unwrap_or(0.0);
                if sales > 0.0 {
                    days += 1;
                }
                total_sales += sales;
                total_gross_profit += input.daily_gross_profit.get(&d).copied().unwrap_or(0.0);
            }
            WeeklySummary {
                week_number: week.week_number,
                start_day: week.start_day,
                end_day: week.end_day,
                total_sales,
                total_gross_profit,
                gross_profit_rate: safe_divide(total_gross_profit, total_sales, 0.0),
                days,
            }
        })
        .collect()
}

/// Seven buckets, Sunday first, averaging only days with sales.
pub fn calculate_day_of_week_averages(input: &ForecastInput) -> Vec<DayOfWeekAverage> {
    let buckets = weekday_buckets(input.year, input.month, &input.daily_sales);
    buckets
        .iter()
        .enumerate()
        .map(|(dow, (total, count))| DayOfWeekAverage {
            day_of_week: dow,
            average_sales: safe_divide(*total, *count as f64, 0.0),
            count: *count,
        })
        .collect()
}

pub(crate) fn weekday_buckets(
    year: i32,
    month: u32,
    daily_sales: &BTreeMap<u32, f64>,
) -> [(f64, u32); 7] {
    let mut buckets = [(0.0, 0u32); 7];
    for (day, sales) in daily_sales.range(1..=days_in_month(year, month)) {
        if *sales <= 0.0 {
            continue;
        }
        if let Some(dow) = weekday_index(year, month, *day) {
            buckets[dow].0 += sales;
            buckets[dow].1 += 1;
        }
    }
    buckets
}

/// Days whose z-score against the selling-day mean exceeds `threshold` in
/// magnitude. Needs at least three selling days and some variance.
pub fn detect_anomalies(
    daily_sales: &BTreeMap<u32, f64>,
    threshold: f64,
) -> Vec<AnomalyDetectionResult> {
    let entries: Vec<(u32, f64)> = daily_sales
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(d, v)| (*d, *v))
        .collect();
    if entries.len() < 3 {
        return Vec::new();
    }

    let values: Vec<f64> = entries.iter().map(|(_, v)| *v).collect();
    let (mean, std_dev) = calculate_std_dev(&values);
    if std_dev == 0.0 {
        return Vec::new();
    }

    entries
        .into_iter()
        .filter_map(|(day, value)| {
            let z_score = (value - mean) / std_dev;
            (z_score.abs() > threshold).then_some(AnomalyDetectionResult {
                day,
                value,
                mean,
                std_dev,
                z_score,
                is_anomaly: true,
            })
        })
        .collect()
}

pub fn calculate_forecast(input: &ForecastInput) -> ForecastResult {
    ForecastResult {
        weekly_summaries: calculate_weekly_summaries(input),
        day_of_week_averages: calculate_day_of_week_averages(input),
        anomalies: detect_anomalies(&input.daily_sales, DEFAULT_ANOMALY_THRESHOLD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev() {
        let (mean, sd) = calculate_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
        assert_eq!(calculate_std_dev(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_week_ranges_monday_aligned() {
        // 2026-02-01 is a Sunday
        let weeks = week_ranges(2026, 2);
        assert_eq!(
            weeks[0],
            WeekRange {
                week_number: 1,
                start_day: 1,
                end_day: 1
            }
        );
        assert_eq!(weeks[1].start_day, 2);
        assert_eq!(weeks[1].end_day, 8);
        let last = weeks.last().unwrap();
        assert_eq!(last.end_day, 28);
        assert_eq!(weeks.len(), 5);
    }

    #[test]
    fn test_weekly_summaries() {
        let input = ForecastInput {
            year: 2026,
            month: 2,
            daily_sales: [(1, 100.0), (2, 200.0), (3, 0.0), (8, 300.0)].into_iter().collect(),
            daily_gross_profit: [(2, 50.0), (8, 75.0)].into_iter().collect(),
        };
        let weeks = calculate_weekly_summaries(&input);
        assert_eq!(weeks[0].total_sales, 100.0);
        assert_eq!(weeks[0].gross_profit_rate, 0.0);
        assert_eq!(weeks[1].total_sales, 500.0);
        assert_eq!(weeks[1].days, 2);
        assert!((weeks[1].gross_profit_rate - 0.25).abs() < 1e-12);
        assert_eq!(weeks[2].days, 0);
    }

    #[test]
    fn test_day_of_week_averages() {
        // Sundays in February 2026: 1, 8, 15
        let input = ForecastInput {
            year: 2026,
            month: 2,
            daily_sales: [(1, 100.0), (8, 300.0), (15, 0.0), (2, 50.0)].into_iter().collect(),
            ..ForecastInput::default()
        };
        let averages = calculate_day_of_week_averages(&input);
        assert_eq!(averages.len(), 7);
        assert_eq!(averages[0].average_sales, 200.0);
        assert_eq!(averages[0].count, 2);
        assert_eq!(averages[1].average_sales, 50.0);
        assert_eq!(averages[3].count, 0);
    }

    #[test]
    fn test_detect_anomalies() {
        let mut daily: BTreeMap<u32, f64> = (1..=10).map(|d| (d, 100.0)).collect();
        daily.insert(11, 1000.0);
        let anomalies = detect_anomalies(&daily, DEFAULT_ANOMALY_THRESHOLD);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].day, 11);
        assert!(anomalies[0].z_score > 2.0);
    }

    #[test]
    fn test_detect_anomalies_needs_data_and_variance() {
        let two: BTreeMap<u32, f64> = [(1, 1.0), (2, 100.0)].into_iter().collect();
        assert!(detect_anomalies(&two, 2.0).is_empty());
        let flat: BTreeMap<u32, f64> = (1..=5).map(|d| (d, 10.0)).collect();
        assert!(detect_anomalies(&flat, 2.0).is_empty());
    }
}
