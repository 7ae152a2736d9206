use crate::utils::safe_divide;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryMethodInput {
    pub opening_inventory: Option<f64>,
    pub closing_inventory: Option<f64>,
    pub total_purchase_cost: f64,
    pub total_sales: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryMethodResult {
    pub cogs: Option<f64>,
    pub gross_profit: Option<f64>,
    pub gross_profit_rate: Option<f64>,
}

/// Accounting gross profit from physical inventory counts, over all sales
/// and all purchases. Unknown when either count is missing.
///
/// `cogs = opening + purchases - closing`, `gross_profit = sales - cogs`.
pub fn calculate_inventory_method(input: &InventoryMethodInput) -> InventoryMethodResult {
    let (Some(opening), Some(closing)) = (input.opening_inventory, input.closing_inventory) else {
        return InventoryMethodResult::default();
    };

    let cogs = opening + input.total_purchase_cost - closing;
    let gross_profit = input.total_sales - cogs;
    InventoryMethodResult {
        cogs: Some(cogs),
        gross_profit: Some(gross_profit),
        gross_profit_rate: Some(safe_divide(gross_profit, input.total_sales, 0.0)),
    }
}
