//! Cross-store rollups. Money fields are summed; rates are either weighted
//! by sales or recomputed from the summed totals.

use super::budget::{calculate_budget_analysis, BudgetAnalysisInput};
use super::estimation::calculate_discount_rate;
use super::inventory::{calculate_inventory_method, InventoryMethodInput};
use crate::error::{LedgerError, Result};
use crate::records::{
    CategoryType, DailyRecord, StoreResult, SupplierTotal, TransferDetails, TransferTotals,
};
use crate::schema::CostPricePair;
use crate::utils::safe_divide;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const AGGREGATE_STORE_ID: &str = "aggregate";

pub fn sum_store_values(stores: &[StoreResult], getter: impl Fn(&StoreResult) -> f64) -> f64 {
    stores.iter().map(getter).sum()
}

/// Sum of the present values, `None` when no store has one.
pub fn sum_nullable_values(
    stores: &[StoreResult],
    getter: impl Fn(&StoreResult) -> Option<f64>,
) -> Option<f64> {
    stores
        .iter()
        .filter_map(getter)
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// `Σ rate × weight / Σ weight` over stores with a positive weight.
pub fn weighted_average_by_sales<'a>(
    stores: impl IntoIterator<Item = &'a StoreResult>,
    rate: impl Fn(&StoreResult) -> f64,
    weight: impl Fn(&StoreResult) -> f64,
) -> f64 {
    let (weighted_sum, total_weight) = stores
        .into_iter()
        .filter(|s| weight(s) > 0.0)
        .fold((0.0, 0.0), |(sum, total), s| {
            let w = weight(s);
            (sum + rate(s) * w, total + w)
        });
    safe_divide(weighted_sum, total_weight, 0.0)
}

/// Headline figures for all stores.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub total_sales: f64,
    pub total_core_sales: f64,
    pub gross_sales: f64,
    pub delivery_sales_price: f64,
    pub flower_sales_price: f64,
    pub direct_produce_sales_price: f64,

    pub total_cost: f64,
    pub inventory_cost: f64,
    pub delivery_sales_cost: f64,

    pub inv_method_cogs: Option<f64>,
    pub inv_method_gross_profit: Option<f64>,
    pub inv_method_gross_profit_rate: Option<f64>,

    pub est_method_cogs: f64,
    pub est_method_margin: f64,
    pub est_method_margin_rate: f64,
    pub est_method_closing_inventory: Option<f64>,

    pub total_discount: f64,
    pub discount_rate: f64,
    pub discount_loss_cost: f64,

    pub average_markup_rate: f64,
    pub core_markup_rate: f64,

    pub total_consumable: f64,
    pub consumable_rate: f64,

    pub budget: f64,
    pub gross_profit_budget: f64,

    pub opening_inventory: Option<f64>,
    pub closing_inventory: Option<f64>,

    pub elapsed_days: u32,
    pub sales_days: u32,
    pub average_daily_sales: f64,
    pub projected_sales: f64,
    pub projected_achievement: f64,
}

pub fn aggregate_stores(stores: &[StoreResult]) -> AggregatedResult {
    if stores.is_empty() {
        return AggregatedResult::default();
    }

    let total_sales = sum_store_values(stores, |s| s.total_sales);
    let total_core_sales = sum_store_values(stores, |s| s.total_core_sales);
    let est_method_margin = sum_store_values(stores, |s| s.est_method_margin);
    let total_consumable = sum_store_values(stores, |s| s.total_consumable);
    let budget = sum_store_values(stores, |s| s.budget);
    let projected_sales = sum_store_values(stores, |s| s.projected_sales);

    let with_inv_rate: Vec<&StoreResult> = stores
        .iter()
        .filter(|s| s.inv_method_gross_profit_rate.is_some())
        .collect();
    let inv_method_gross_profit_rate = (!with_inv_rate.is_empty()).then(|| {
        weighted_average_by_sales(
            with_inv_rate,
            |s| s.inv_method_gross_profit_rate.unwrap_or(0.0),
            |s| s.total_sales,
        )
    });

    AggregatedResult {
        total_sales,
        total_core_sales,
        gross_sales: sum_store_values(stores, |s| s.gross_sales),
        delivery_sales_price: sum_store_values(stores, |s| s.delivery_sales_price),
        flower_sales_price: sum_store_values(stores, |s| s.flower_sales_price),
        direct_produce_sales_price: sum_store_values(stores, |s| s.direct_produce_sales_price),
        total_cost: sum_store_values(stores, |s| s.total_cost),
        inventory_cost: sum_store_values(stores, |s| s.inventory_cost),
        delivery_sales_cost: sum_store_values(stores, |s| s.delivery_sales_cost),
        inv_method_cogs: sum_nullable_values(stores, |s| s.inv_method_cogs),
        inv_method_gross_profit: sum_nullable_values(stores, |s| s.inv_method_gross_profit),
        inv_method_gross_profit_rate,
        est_method_cogs: sum_store_values(stores, |s| s.est_method_cogs),
        est_method_margin,
        est_method_margin_rate: safe_divide(est_method_margin, total_core_sales, 0.0),
        est_method_closing_inventory: sum_nullable_values(stores, |s| {
            s.est_method_closing_inventory
        }),
        total_discount: sum_store_values(stores, |s| s.total_discount),
        discount_rate: weighted_average_by_sales(stores, |s| s.discount_rate, |s| s.total_sales),
        discount_loss_cost: sum_store_values(stores, |s| s.discount_loss_cost),
        average_markup_rate: weighted_average_by_sales(
            stores,
            |s| s.average_markup_rate,
            |s| s.total_cost,
        ),
        core_markup_rate: weighted_average_by_sales(
            stores,
            |s| s.core_markup_rate,
            |s| s.total_core_sales,
        ),
        total_consumable,
        consumable_rate: safe_divide(total_consumable, total_core_sales, 0.0),
        budget,
        gross_profit_budget: sum_store_values(stores, |s| s.gross_profit_budget),
        opening_inventory: sum_nullable_values(stores, |s| s.opening_inventory),
        closing_inventory: sum_nullable_values(stores, |s| s.closing_inventory),
        elapsed_days: stores.iter().map(|s| s.elapsed_days).max().unwrap_or(0),
        sales_days: stores.iter().map(|s| s.sales_days).max().unwrap_or(0),
        average_daily_sales: sum_store_values(stores, |s| s.average_daily_sales),
        projected_sales,
        projected_achievement: safe_divide(projected_sales, budget, 0.0),
    }
}

/// Merges store results into a single "all stores" result with day-by-day
/// records, recomputing every rate from the merged totals.
pub fn aggregate_store_results(results: &[StoreResult], days_in_month: u32) -> Result<StoreResult> {
    if results.is_empty() {
        return Err(LedgerError::EmptyAggregation);
    }

    let mut daily: BTreeMap<u32, DailyRecord> = BTreeMap::new();
    let mut category_totals: BTreeMap<CategoryType, CostPricePair> = BTreeMap::new();
    let mut supplier_totals: BTreeMap<String, SupplierTotal> = BTreeMap::new();
    let mut budget_daily: BTreeMap<u32, f64> = BTreeMap::new();
    let mut transfers = TransferTotals::default();

    for r in results {
        for (day, rec) in &r.daily {
            match daily.get_mut(day) {
                Some(existing) => existing.merge(rec),
                None => {
                    daily.insert(*day, rec.clone());
                }
            }
        }
        for (category, pair) in &r.category_totals {
            *category_totals.entry(*category).or_default() += *pair;
        }
        for (code, supplier) in &r.supplier_totals {
            supplier_totals
                .entry(code.clone())
                .and_modify(|existing| {
                    existing.cost += supplier.cost;
                    existing.price += supplier.price;
                    existing.markup_rate = safe_divide(
                        existing.price - existing.cost,
                        existing.price,
                        0.0,
                    );
                })
                .or_insert_with(|| supplier.clone());
        }
        for (day, value) in &r.budget_daily {
            *budget_daily.entry(*day).or_default() += value;
        }
        transfers += r.transfer_details.totals();
    }

    let sum = |getter: fn(&StoreResult) -> f64| sum_store_values(results, getter);
    let total_sales = sum(|r| r.total_sales);
    let total_core_sales = sum(|r| r.total_core_sales);
    let total_cost = sum(|r| r.total_cost);
    let total_discount = sum(|r| r.total_discount);
    let total_consumable = sum(|r| r.total_consumable);
    let budget = sum(|r| r.budget);
    let gross_profit_budget = sum(|r| r.gross_profit_budget);
    let est_method_margin = sum(|r| r.est_method_margin);

    let elapsed_days = results.iter().map(|r| r.elapsed_days).max().unwrap_or(0);
    let sales_days = results.iter().map(|r| r.sales_days).max().unwrap_or(0);
    let opening_inventory = sum_nullable_values(results, |r| r.opening_inventory);
    let closing_inventory = sum_nullable_values(results, |r| r.closing_inventory);

    let purchase = supplier_totals
        .values()
        .fold(CostPricePair::ZERO, |acc, s| acc + CostPricePair::new(s.cost, s.price));
    let category = |c| category_totals.get(&c).copied().unwrap_or_default();
    let all_purchase =
        purchase + category(CategoryType::Flowers) + category(CategoryType::DirectProduce);

    let inventory_method = calculate_inventory_method(&InventoryMethodInput {
        opening_inventory,
        closing_inventory,
        total_purchase_cost: total_cost,
        total_sales,
    });

    let sales_daily: BTreeMap<u32, f64> = daily.iter().map(|(d, r)| (*d, r.sales)).collect();
    let budget_analysis = calculate_budget_analysis(&BudgetAnalysisInput {
        total_sales,
        budget,
        budget_daily: &budget_daily,
        sales_daily: &sales_daily,
        elapsed_days,
        sales_days,
        days_in_month,
    });

    debug!(
        "Aggregated {} store results over {} days",
        results.len(),
        daily.len()
    );

    Ok(StoreResult {
        store_id: AGGREGATE_STORE_ID.to_string(),
        opening_inventory,
        closing_inventory,
        total_sales,
        total_core_sales,
        delivery_sales_price: sum(|r| r.delivery_sales_price),
        flower_sales_price: sum(|r| r.flower_sales_price),
        direct_produce_sales_price: sum(|r| r.direct_produce_sales_price),
        gross_sales: sum(|r| r.gross_sales),
        total_cost,
        inventory_cost: sum(|r| r.inventory_cost),
        delivery_sales_cost: sum(|r| r.delivery_sales_cost),
        inv_method_cogs: inventory_method.cogs,
        inv_method_gross_profit: inventory_method.gross_profit,
        inv_method_gross_profit_rate: inventory_method.gross_profit_rate,
        est_method_cogs: sum(|r| r.est_method_cogs),
        est_method_margin,
        est_method_margin_rate: safe_divide(est_method_margin, total_core_sales, 0.0),
        est_method_closing_inventory: sum_nullable_values(results, |r| {
            r.est_method_closing_inventory
        }),
        total_discount,
        discount_rate: calculate_discount_rate(total_sales, total_discount),
        discount_loss_cost: sum(|r| r.discount_loss_cost),
        average_markup_rate: safe_divide(
            all_purchase.price - all_purchase.cost,
            all_purchase.price,
            0.0,
        ),
        core_markup_rate: safe_divide(purchase.price - purchase.cost, purchase.price, 0.0),
        total_consumable,
        consumable_rate: safe_divide(total_consumable, total_sales, 0.0),
        budget,
        gross_profit_budget,
        gross_profit_rate_budget: safe_divide(gross_profit_budget, budget, 0.0),
        budget_daily,
        daily,
        category_totals,
        supplier_totals,
        transfer_details: TransferDetails::from(transfers),
        elapsed_days,
        sales_days,
        average_daily_sales: budget_analysis.average_daily_sales,
        projected_sales: budget_analysis.projected_sales,
        projected_achievement: budget_analysis.projected_achievement,
        budget_achievement_rate: budget_analysis.budget_achievement_rate,
        budget_progress_rate: budget_analysis.budget_progress_rate,
        remaining_budget: budget_analysis.remaining_budget,
        daily_cumulative: budget_analysis.daily_cumulative,
    })
}
