use crate::records::DailyCumulative;
use crate::utils::safe_divide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct BudgetAnalysisInput<'a> {
    pub total_sales: f64,
    pub budget: f64,
    pub budget_daily: &'a BTreeMap<u32, f64>,
    pub sales_daily: &'a BTreeMap<u32, f64>,
    pub elapsed_days: u32,
    /// Days with non-zero sales.
    pub sales_days: u32,
    pub days_in_month: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetAnalysisResult {
    /// Sales against the full-month budget.
    pub budget_achievement_rate: f64,
    /// Sales against the budget accrued through the elapsed days.
    pub budget_progress_rate: f64,
    /// Accrued budget against the full-month budget.
    pub budget_elapsed_rate: f64,
    pub average_daily_sales: f64,
    pub projected_sales: f64,
    pub projected_achievement: f64,
    pub remaining_budget: f64,
    pub daily_cumulative: BTreeMap<u32, DailyCumulative>,
}

/// Sum of daily budgets for days `1..=through_day`.
pub fn cumulative_budget(budget_daily: &BTreeMap<u32, f64>, through_day: u32) -> f64 {
    budget_daily.range(1..=through_day).map(|(_, v)| v).sum()
}

/// Running `(sales, budget)` totals for every day of the month.
pub fn daily_cumulative(
    sales_daily: &BTreeMap<u32, f64>,
    budget_daily: &BTreeMap<u32, f64>,
    days_in_month: u32,
) -> BTreeMap<u32, DailyCumulative> {
    let mut running = DailyCumulative::default();
    (1..=days_in_month)
        .map(|day| {
            running.sales += sales_daily.get(&day).copied().unwrap_or(0.0);
            running.budget += budget_daily.get(&day).copied().unwrap_or(0.0);
            (day, running)
        })
        .collect()
}

pub fn calculate_budget_analysis(input: &BudgetAnalysisInput<'_>) -> BudgetAnalysisResult {
    let accrued = cumulative_budget(input.budget_daily, input.elapsed_days);
    let average_daily_sales = safe_divide(input.total_sales, input.sales_days as f64, 0.0);
    let remaining_days = input.days_in_month.saturating_sub(input.elapsed_days);
    let projected_sales = input.total_sales + average_daily_sales * remaining_days as f64;

    BudgetAnalysisResult {
        budget_achievement_rate: safe_divide(input.total_sales, input.budget, 0.0),
        budget_progress_rate: safe_divide(input.total_sales, accrued, 0.0),
        budget_elapsed_rate: safe_divide(accrued, input.budget, 0.0),
        average_daily_sales,
        projected_sales,
        projected_achievement: safe_divide(projected_sales, input.budget, 0.0),
        remaining_budget: input.budget - input.total_sales,
        daily_cumulative: daily_cumulative(
            input.sales_daily,
            input.budget_daily,
            input.days_in_month,
        ),
    }
}
