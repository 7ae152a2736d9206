use crate::records::DailyRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inventory-method result for the span between two inventory checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinInterval {
    pub start_day: u32,
    pub end_day: u32,
    pub opening_inventory: f64,
    pub closing_inventory: f64,
    pub total_sales: f64,
    pub total_purchase_cost: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub gross_profit_rate: f64,
}

/// Splits the month at each `(day, closing_inventory)` pin. Each interval's
/// closing count becomes the next interval's opening.
pub fn calculate_pin_intervals(
    daily: &BTreeMap<u32, DailyRecord>,
    opening_inventory: Option<f64>,
    pins: &[(u32, f64)],
) -> Vec<PinInterval> {
    let mut sorted = pins.to_vec();
    sorted.sort_by_key(|(day, _)| *day);

    let mut intervals = Vec::with_capacity(sorted.len());
    let mut prev_day = 0;
    let mut prev_inventory = opening_inventory.unwrap_or(0.0);

    for (day, closing) in sorted {
        let (total_sales, total_purchase_cost) = daily
            .range(prev_day + 1..=day)
            .fold((0.0, 0.0), |(sales, cost), (_, rec)| {
                (sales + rec.sales, cost + rec.total_cost())
            });

        let cogs = prev_inventory + total_purchase_cost - closing;
        let gross_profit = total_sales - cogs;
        intervals.push(PinInterval {
            start_day: prev_day + 1,
            end_day: day,
            opening_inventory: prev_inventory,
            closing_inventory: closing,
            total_sales,
            total_purchase_cost,
            cogs,
            gross_profit,
            gross_profit_rate: if total_sales > 0.0 {
                gross_profit / total_sales
            } else {
                0.0
            },
        });

        prev_day = day;
        prev_inventory = closing;
    }
    intervals
}
