//! Assembles normalized sources into per-store monthly results.

use crate::calculations::budget::{calculate_budget_analysis, BudgetAnalysisInput};
use crate::calculations::estimation::{
    calculate_core_sales, calculate_discount_loss_cost, calculate_discount_rate,
    calculate_estimation_method, EstimationInput,
};
use crate::calculations::inventory::{calculate_inventory_method, InventoryMethodInput};
use crate::records::{
    CategoryType, DailyRecord, StoreResult, SupplierTotal, TransferBreakdownEntry,
    TransferDetails, TransferTotals,
};
use crate::schema::{CostPricePair, ImportedData, TransferRecord};
use crate::settings::AppSettings;
use crate::utils::{days_in_month, safe_divide};
use log::debug;
use std::collections::BTreeMap;

/// Month-level totals gathered while walking one store's days.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthlyAccumulator {
    pub daily: BTreeMap<u32, DailyRecord>,
    pub supplier_totals: BTreeMap<String, SupplierTotal>,
    pub total_sales: f64,
    /// Sum of `DailyRecord::total_cost` over recorded days.
    pub total_cost: f64,
    pub purchase: CostPricePair,
    pub flowers: CostPricePair,
    pub direct_produce: CostPricePair,
    pub total_discount: f64,
    pub total_consumable: f64,
    pub transfers: TransferTotals,
    pub sales_days: u32,
    /// Last day with any data.
    pub elapsed_days: u32,
}

fn sum_records(records: &[TransferRecord]) -> CostPricePair {
    records
        .iter()
        .fold(CostPricePair::ZERO, |acc, r| acc + CostPricePair::new(r.cost, r.price))
}

fn breakdown(records: &[TransferRecord]) -> Vec<TransferBreakdownEntry> {
    records
        .iter()
        .map(|r| TransferBreakdownEntry {
            from_store_id: r.from_store_id.clone(),
            to_store_id: r.to_store_id.clone(),
            cost: r.cost,
            price: r.price,
        })
        .collect()
}

/// Walks days `1..=days_in_month` for one store. A `DailyRecord` is kept
/// only for days with sales, a non-zero cost leg, a markdown or consumables;
/// month totals include every day.
pub fn build_daily_records(
    store_id: &str,
    data: &ImportedData,
    days_in_month: u32,
) -> MonthlyAccumulator {
    let mut acc = MonthlyAccumulator::default();

    for day in 1..=days_in_month {
        let purchase_day = data.purchase.get(store_id, day);
        let sales = data.sales.get(store_id, day).map_or(0.0, |s| s.sales);
        let flowers = data
            .flowers
            .get(store_id, day)
            .map_or(CostPricePair::ZERO, |e| CostPricePair::new(e.cost, e.price));
        let direct_produce = data
            .direct_produce
            .get(store_id, day)
            .map_or(CostPricePair::ZERO, |e| CostPricePair::new(e.cost, e.price));
        let consumable = data
            .consumables
            .get(store_id, day)
            .cloned()
            .unwrap_or_default();
        let discount_amount = data.discount.get(store_id, day).map_or(0.0, |d| d.discount);
        let discount_absolute = discount_amount.abs();

        let mut rec = DailyRecord {
            day,
            sales,
            core_sales: calculate_core_sales(sales, flowers.price, direct_produce.price).core_sales,
            gross_sales: sales + discount_absolute,
            purchase: purchase_day.map_or(CostPricePair::ZERO, |p| p.total),
            delivery_sales: flowers + direct_produce,
            flowers,
            direct_produce,
            consumable,
            discount_amount,
            discount_absolute,
            ..DailyRecord::default()
        };

        if let Some(inbound) = data.inter_store_in.get(store_id, day) {
            rec.inter_store_in = sum_records(&inbound.inter_store_in);
            rec.inter_department_in = sum_records(&inbound.inter_department_in);
            rec.transfer_breakdown.inter_store_in = breakdown(&inbound.inter_store_in);
            rec.transfer_breakdown.inter_department_in = breakdown(&inbound.inter_department_in);
        }
        if let Some(outbound) = data.inter_store_out.get(store_id, day) {
            rec.inter_store_out = sum_records(&outbound.inter_store_out);
            rec.inter_department_out = sum_records(&outbound.inter_department_out);
            rec.transfer_breakdown.inter_store_out = breakdown(&outbound.inter_store_out);
            rec.transfer_breakdown.inter_department_out = breakdown(&outbound.inter_department_out);
        }

        if let Some(purchase_day) = purchase_day {
            for (code, supplier) in &purchase_day.suppliers {
                let pair = CostPricePair::new(supplier.cost, supplier.price);
                rec.supplier_breakdown.insert(code.clone(), pair);
                let total = acc
                    .supplier_totals
                    .entry(code.clone())
                    .or_insert_with(|| SupplierTotal {
                        supplier_code: code.clone(),
                        supplier_name: supplier.name.clone(),
                        category: CategoryType::Other,
                        cost: 0.0,
                        price: 0.0,
                        markup_rate: 0.0,
                    });
                total.cost += pair.cost;
                total.price += pair.price;
            }
        }

        acc.total_sales += rec.sales;
        acc.purchase += rec.purchase;
        acc.flowers += rec.flowers;
        acc.direct_produce += rec.direct_produce;
        acc.total_discount += rec.discount_absolute;
        acc.total_consumable += rec.consumable.cost;
        acc.transfers += TransferTotals {
            inter_store_in: rec.inter_store_in,
            inter_store_out: rec.inter_store_out,
            inter_department_in: rec.inter_department_in,
            inter_department_out: rec.inter_department_out,
        };

        let has_data = rec.sales > 0.0
            || rec.purchase.cost != 0.0
            || rec.delivery_sales.cost != 0.0
            || rec.inter_store_in.cost != 0.0
            || rec.inter_store_out.cost != 0.0
            || rec.inter_department_in.cost != 0.0
            || rec.inter_department_out.cost != 0.0
            || rec.discount_absolute != 0.0
            || rec.consumable.cost != 0.0;

        if has_data {
            acc.elapsed_days = day;
            if rec.sales > 0.0 {
                acc.sales_days += 1;
            }
            acc.total_cost += rec.total_cost();
            acc.daily.insert(day, rec);
        }
    }

    debug!(
        "Store {}: {} recorded days, {} selling days",
        store_id,
        acc.daily.len(),
        acc.sales_days
    );
    acc
}

/// Turns a store's accumulator into its monthly result using the inventory
/// checkpoints and budget imported for that store.
pub fn assemble_store_result(
    store_id: &str,
    acc: MonthlyAccumulator,
    data: &ImportedData,
    settings: &AppSettings,
    days_in_month: u32,
) -> StoreResult {
    let inventory = data.settings.get(store_id);
    let opening_inventory = inventory.and_then(|c| c.opening_inventory);
    let closing_inventory = inventory.and_then(|c| c.closing_inventory);
    let budget_data = data.budget.get(store_id);

    let delivery = acc.flowers + acc.direct_produce;
    let total_core_sales =
        calculate_core_sales(acc.total_sales, acc.flowers.price, acc.direct_produce.price)
            .core_sales;
    let inventory_cost = acc.total_cost - delivery.cost;
    let discount_rate = calculate_discount_rate(acc.total_sales, acc.total_discount);

    let transfer = acc.transfers.net();
    let all_purchase = acc.purchase + delivery + transfer;
    let core_purchase = acc.purchase + transfer;
    let average_markup_rate =
        safe_divide(all_purchase.price - all_purchase.cost, all_purchase.price, 0.0);
    let core_markup_rate = safe_divide(
        core_purchase.price - core_purchase.cost,
        core_purchase.price,
        settings.default_markup_rate,
    );

    let inventory_method = calculate_inventory_method(&InventoryMethodInput {
        opening_inventory,
        closing_inventory,
        total_purchase_cost: acc.total_cost,
        total_sales: acc.total_sales,
    });
    let estimation = calculate_estimation_method(&EstimationInput {
        core_sales: total_core_sales,
        discount_rate,
        markup_rate: core_markup_rate,
        consumable_cost: acc.total_consumable,
        opening_inventory,
        inventory_purchase_cost: inventory_cost,
    });

    let mut supplier_totals = acc.supplier_totals;
    let mut category_totals: BTreeMap<CategoryType, CostPricePair> = BTreeMap::new();
    for (code, supplier) in supplier_totals.iter_mut() {
        supplier.category = settings
            .supplier_category_map
            .get(code)
            .copied()
            .map_or(CategoryType::Other, CategoryType::from);
        supplier.markup_rate = safe_divide(supplier.price - supplier.cost, supplier.price, 0.0);
        *category_totals.entry(supplier.category).or_default() +=
            CostPricePair::new(supplier.cost, supplier.price);
    }
    let mut add_category = |category: CategoryType, pair: CostPricePair| {
        *category_totals.entry(category).or_default() += pair;
    };
    add_category(CategoryType::Flowers, acc.flowers);
    add_category(CategoryType::DirectProduce, acc.direct_produce);
    add_category(
        CategoryType::Consumables,
        CostPricePair::new(acc.total_consumable, 0.0),
    );
    add_category(
        CategoryType::InterStore,
        acc.transfers.inter_store_in + acc.transfers.inter_store_out,
    );
    add_category(
        CategoryType::InterDepartment,
        acc.transfers.inter_department_in + acc.transfers.inter_department_out,
    );

    let budget = budget_data.map_or(settings.default_budget, |b| b.total);
    let budget_daily = budget_data.map(|b| b.daily.clone()).unwrap_or_default();
    let gross_profit_budget = inventory.and_then(|c| c.gross_profit_budget).unwrap_or(0.0);

    let sales_daily: BTreeMap<u32, f64> = acc.daily.iter().map(|(d, r)| (*d, r.sales)).collect();
    let budget_analysis = calculate_budget_analysis(&BudgetAnalysisInput {
        total_sales: acc.total_sales,
        budget,
        budget_daily: &budget_daily,
        sales_daily: &sales_daily,
        elapsed_days: acc.elapsed_days,
        sales_days: acc.sales_days,
        days_in_month,
    });

    StoreResult {
        store_id: store_id.to_string(),
        opening_inventory,
        closing_inventory,
        total_sales: acc.total_sales,
        total_core_sales,
        delivery_sales_price: delivery.price,
        flower_sales_price: acc.flowers.price,
        direct_produce_sales_price: acc.direct_produce.price,
        gross_sales: acc.total_sales + acc.total_discount,
        total_cost: acc.total_cost,
        inventory_cost,
        delivery_sales_cost: delivery.cost,
        inv_method_cogs: inventory_method.cogs,
        inv_method_gross_profit: inventory_method.gross_profit,
        inv_method_gross_profit_rate: inventory_method.gross_profit_rate,
        est_method_cogs: estimation.cogs,
        est_method_margin: estimation.margin,
        est_method_margin_rate: estimation.margin_rate,
        est_method_closing_inventory: estimation.closing_inventory,
        total_discount: acc.total_discount,
        discount_rate,
        discount_loss_cost: calculate_discount_loss_cost(
            total_core_sales,
            core_markup_rate,
            discount_rate,
        ),
        average_markup_rate,
        core_markup_rate,
        total_consumable: acc.total_consumable,
        consumable_rate: safe_divide(acc.total_consumable, acc.total_sales, 0.0),
        budget,
        gross_profit_budget,
        gross_profit_rate_budget: safe_divide(gross_profit_budget, budget, 0.0),
        budget_daily,
        daily: acc.daily,
        category_totals,
        supplier_totals,
        transfer_details: TransferDetails::from(acc.transfers),
        elapsed_days: acc.elapsed_days,
        sales_days: acc.sales_days,
        average_daily_sales: budget_analysis.average_daily_sales,
        projected_sales: budget_analysis.projected_sales,
        projected_achievement: budget_analysis.projected_achievement,
        budget_achievement_rate: budget_analysis.budget_achievement_rate,
        budget_progress_rate: budget_analysis.budget_progress_rate,
        remaining_budget: budget_analysis.remaining_budget,
        daily_cumulative: budget_analysis.daily_cumulative,
    }
}

/// Results for every known store of the target month, keyed by store id.
pub fn build_store_results(
    data: &ImportedData,
    settings: &AppSettings,
) -> BTreeMap<String, StoreResult> {
    let days = days_in_month(settings.target_year, settings.target_month);
    data.stores
        .keys()
        .map(|store_id| {
            let acc = build_daily_records(store_id, data, days);
            let result = assemble_store_result(store_id, acc, data, settings, days);
            (store_id.clone(), result)
        })
        .collect()
}
