//! Assembled per-store shapes: daily records and the monthly store result.

use crate::schema::{ConsumableDailyRecord, CostPricePair};
use crate::settings::CustomCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferBreakdownEntry {
    pub from_store_id: String,
    pub to_store_id: String,
    pub cost: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferBreakdown {
    pub inter_store_in: Vec<TransferBreakdownEntry>,
    pub inter_store_out: Vec<TransferBreakdownEntry>,
    pub inter_department_in: Vec<TransferBreakdownEntry>,
    pub inter_department_out: Vec<TransferBreakdownEntry>,
}

impl TransferBreakdown {
    fn extend(&mut self, other: &TransferBreakdown) {
        self.inter_store_in.extend(other.inter_store_in.iter().cloned());
        self.inter_store_out.extend(other.inter_store_out.iter().cloned());
        self.inter_department_in
            .extend(other.inter_department_in.iter().cloned());
        self.inter_department_out
            .extend(other.inter_department_out.iter().cloned());
    }
}

/// One store's figures for one day of the month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyRecord {
    pub day: u32,
    pub sales: f64,
    /// Sales minus flowers and direct produce, never negative.
    pub core_sales: f64,
    /// Sales before markdowns.
    pub gross_sales: f64,
    pub purchase: CostPricePair,
    pub delivery_sales: CostPricePair,
    pub inter_store_in: CostPricePair,
    pub inter_store_out: CostPricePair,
    pub inter_department_in: CostPricePair,
    pub inter_department_out: CostPricePair,
    pub flowers: CostPricePair,
    pub direct_produce: CostPricePair,
    pub consumable: ConsumableDailyRecord,
    pub discount_amount: f64,
    pub discount_absolute: f64,
    pub supplier_breakdown: BTreeMap<String, CostPricePair>,
    pub transfer_breakdown: TransferBreakdown,
}

impl DailyRecord {
    /// Total cost for the day: purchases, all four transfer legs and delivery
    /// sales. Every cost-of-goods figure in the crate sums days through this.
    pub fn total_cost(&self) -> f64 {
        self.purchase.cost
            + self.inter_store_in.cost
            + self.inter_store_out.cost
            + self.inter_department_in.cost
            + self.inter_department_out.cost
            + self.delivery_sales.cost
    }

    /// Adds another store's record for the same day.
    pub fn merge(&mut self, other: &DailyRecord) {
        self.sales += other.sales;
        self.core_sales += other.core_sales;
        self.gross_sales += other.gross_sales;
        self.purchase += other.purchase;
        self.delivery_sales += other.delivery_sales;
        self.inter_store_in += other.inter_store_in;
        self.inter_store_out += other.inter_store_out;
        self.inter_department_in += other.inter_department_in;
        self.inter_department_out += other.inter_department_out;
        self.flowers += other.flowers;
        self.direct_produce += other.direct_produce;
        self.consumable.cost += other.consumable.cost;
        self.consumable
            .items
            .extend(other.consumable.items.iter().cloned());
        self.discount_amount += other.discount_amount;
        self.discount_absolute += other.discount_absolute;
        for (code, pair) in &other.supplier_breakdown {
            *self.supplier_breakdown.entry(code.clone()).or_default() += *pair;
        }
        self.transfer_breakdown.extend(&other.transfer_breakdown);
    }
}

/// Purchase categories used for rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryType {
    Market,
    Lfc,
    SaladClub,
    Processed,
    DirectDelivery,
    Flowers,
    DirectProduce,
    Consumables,
    InterStore,
    InterDepartment,
    Other,
}

impl From<CustomCategory> for CategoryType {
    fn from(category: CustomCategory) -> Self {
        match category {
            CustomCategory::MarketPurchase => CategoryType::Market,
            CustomCategory::Lfc => CategoryType::Lfc,
            CustomCategory::Salad => CategoryType::SaladClub,
            CustomCategory::Processed => CategoryType::Processed,
            CustomCategory::Consumables => CategoryType::Consumables,
            CustomCategory::DirectDelivery => CategoryType::DirectDelivery,
            CustomCategory::Other => CategoryType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierTotal {
    pub supplier_code: String,
    pub supplier_name: String,
    pub category: CategoryType,
    pub cost: f64,
    pub price: f64,
    pub markup_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferTotals {
    pub inter_store_in: CostPricePair,
    pub inter_store_out: CostPricePair,
    pub inter_department_in: CostPricePair,
    pub inter_department_out: CostPricePair,
}

impl TransferTotals {
    pub fn net(&self) -> CostPricePair {
        self.inter_store_in
            + self.inter_store_out
            + self.inter_department_in
            + self.inter_department_out
    }
}

impl std::ops::AddAssign for TransferTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.inter_store_in += rhs.inter_store_in;
        self.inter_store_out += rhs.inter_store_out;
        self.inter_department_in += rhs.inter_department_in;
        self.inter_department_out += rhs.inter_department_out;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferDetails {
    pub inter_store_in: CostPricePair,
    pub inter_store_out: CostPricePair,
    pub inter_department_in: CostPricePair,
    pub inter_department_out: CostPricePair,
    pub net_transfer: CostPricePair,
}

impl From<TransferTotals> for TransferDetails {
    fn from(totals: TransferTotals) -> Self {
        Self {
            inter_store_in: totals.inter_store_in,
            inter_store_out: totals.inter_store_out,
            inter_department_in: totals.inter_department_in,
            inter_department_out: totals.inter_department_out,
            net_transfer: totals.net(),
        }
    }
}

impl TransferDetails {
    pub fn totals(&self) -> TransferTotals {
        TransferTotals {
            inter_store_in: self.inter_store_in,
            inter_store_out: self.inter_store_out,
            inter_department_in: self.inter_department_in,
            inter_department_out: self.inter_department_out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyCumulative {
    pub sales: f64,
    pub budget: f64,
}

/// Monthly result for one store (or the all-store aggregate).
///
/// The inventory-method fields are the accounting gross profit. The
/// estimation-method fields only feed the estimated closing inventory used to
/// spot shrinkage against the physical count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreResult {
    pub store_id: String,

    pub opening_inventory: Option<f64>,
    pub closing_inventory: Option<f64>,

    pub total_sales: f64,
    pub total_core_sales: f64,
    pub delivery_sales_price: f64,
    pub flower_sales_price: f64,
    pub direct_produce_sales_price: f64,
    pub gross_sales: f64,

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
    pub gross_profit_rate_budget: f64,
    pub budget_daily: BTreeMap<u32, f64>,

    pub daily: BTreeMap<u32, DailyRecord>,

    pub category_totals: BTreeMap<CategoryType, CostPricePair>,
    pub supplier_totals: BTreeMap<String, SupplierTotal>,
    pub transfer_details: TransferDetails,

    pub elapsed_days: u32,
    pub sales_days: u32,
    pub average_daily_sales: f64,
    pub projected_sales: f64,
    pub projected_achievement: f64,
    pub budget_achievement_rate: f64,
    pub budget_progress_rate: f64,
    pub remaining_budget: f64,
    pub daily_cumulative: BTreeMap<u32, DailyCumulative>,
}

impl StoreResult {
    /// Daily sales keyed by day, as consumed by the forecast functions.
    pub fn sales_by_day(&self) -> BTreeMap<u32, f64> {
        self.daily.iter().map(|(day, rec)| (*day, rec.sales)).collect()
    }
}
