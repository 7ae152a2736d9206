use serde::{Deserialize, Serialize};

const TREND_DEAD_BAND: f64 = 0.03;

/// One month's headline figures, as stored by the host for past months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDataPoint {
    pub year: i32,
    pub month: u32,
    pub total_sales: f64,
    pub total_customers: Option<f64>,
    pub gross_profit: Option<f64>,
    pub gross_profit_rate: Option<f64>,
    pub budget: Option<f64>,
    pub budget_achievement: Option<f64>,
    pub store_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysisResult {
    /// Chronological.
    pub data_points: Vec<MonthlyDataPoint>,
    /// Ratio to the previous point; `None` for the first point or a zero base.
    pub mom_changes: Vec<Option<f64>>,
    /// Ratio to the same month one year earlier, when present and non-zero.
    pub yoy_changes: Vec<Option<f64>>,
    pub moving_avg_3: Vec<Option<f64>>,
    pub moving_avg_6: Vec<Option<f64>>,
    /// January first. Above 1.0 marks a busy month.
    pub seasonal_index: [f64; 12],
    pub overall_trend: TrendDirection,
    pub average_monthly_sales: f64,
}

impl Default for TrendAnalysisResult {
    fn default() -> Self {
        Self {
            data_points: Vec::new(),
            mom_changes: Vec::new(),
            yoy_changes: Vec::new(),
            moving_avg_3: Vec::new(),
            moving_avg_6: Vec::new(),
            seasonal_index: [1.0; 12],
            overall_trend: TrendDirection::Flat,
            average_monthly_sales: 0.0,
        }
    }
}

pub fn analyze_trend(points: &[MonthlyDataPoint]) -> TrendAnalysisResult {
    if points.is_empty() {
        return TrendAnalysisResult::default();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| (p.year, p.month));
    let sales: Vec<f64> = sorted.iter().map(|p| p.total_sales).collect();

    let mom_changes = sales
        .iter()
        .enumerate()
        .map(|(i, current)| match i.checked_sub(1).map(|prev| sales[prev]) {
            Some(prev) if prev != 0.0 => Some(current / prev),
            _ => None,
        })
        .collect();

    let yoy_changes = sorted
        .iter()
        .map(|p| {
            sorted
                .iter()
                .find(|q| q.year == p.year - 1 && q.month == p.month)
                .filter(|q| q.total_sales != 0.0)
                .map(|q| p.total_sales / q.total_sales)
        })
        .collect();

    let average_monthly_sales = sales.iter().sum::<f64>() / sales.len() as f64;

    TrendAnalysisResult {
        mom_changes,
        yoy_changes,
        moving_avg_3: moving_average(&sales, 3),
        moving_avg_6: moving_average(&sales, 6),
        seasonal_index: seasonal_index(&sorted),
        overall_trend: overall_trend(&sales),
        average_monthly_sales,
        data_points: sorted,
    }
}

/// Trailing average; `None` until `window` values are available.
fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            (i + 1 >= window)
                .then(|| values[i + 1 - window..=i].iter().sum::<f64>() / window as f64)
        })
        .collect()
}

fn seasonal_index(points: &[MonthlyDataPoint]) -> [f64; 12] {
    let mut buckets = [(0.0, 0u32); 12];
    for p in points.iter().filter(|p| (1..=12).contains(&p.month)) {
        let bucket = &mut buckets[(p.month - 1) as usize];
        bucket.0 += p.total_sales;
        bucket.1 += 1;
    }

    let (grand_total, grand_count) = buckets
        .iter()
        .fold((0.0, 0), |(t, c), (bt, bc)| (t + bt, c + bc));
    if grand_count == 0 || grand_total == 0.0 {
        return [1.0; 12];
    }
    let grand_avg = grand_total / grand_count as f64;

    buckets.map(|(total, count)| {
        if count == 0 {
            1.0
        } else {
            (total / count as f64) / grand_avg
        }
    })
}

/// Last three months against the (up to) three before them.
fn overall_trend(sales: &[f64]) -> TrendDirection {
    let len = sales.len();
    if len < 4 {
        return TrendDirection::Flat;
    }

    let recent = &sales[len - 3..];
    let previous = &sales[len.saturating_sub(6)..len - 3];
    let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;

    let previous_avg = avg(previous);
    if previous_avg == 0.0 {
        return TrendDirection::Flat;
    }
    let change = (avg(recent) - previous_avg) / previous_avg;
    if change > TREND_DEAD_BAND {
        TrendDirection::Up
    } else if change < -TREND_DEAD_BAND {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}
