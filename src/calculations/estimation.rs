use crate::utils::safe_divide;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimationInput {
    /// Sales excluding flowers and direct produce.
    pub core_sales: f64,
    pub discount_rate: f64,
    pub markup_rate: f64,
    pub consumable_cost: f64,
    pub opening_inventory: Option<f64>,
    /// Purchase cost excluding delivery sales.
    pub inventory_purchase_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimationResult {
    pub gross_sales: f64,
    pub cogs: f64,
    pub margin: f64,
    pub margin_rate: f64,
    pub closing_inventory: Option<f64>,
}

/// Estimated cost of goods from markup and discount rates.
///
/// This is an inventory estimate, not a gross profit figure: its purpose is
/// `closing_inventory`, which is compared against the physical count to
/// surface unrecorded losses. The margin is never reconciled with the
/// inventory method.
pub fn calculate_estimation_method(input: &EstimationInput) -> EstimationResult {
    let divisor = 1.0 - input.discount_rate;
    let gross_sales = if divisor > 0.0 {
        input.core_sales / divisor
    } else {
        input.core_sales
    };

    let cogs = gross_sales * (1.0 - input.markup_rate) + input.consumable_cost;
    let margin = input.core_sales - cogs;

    EstimationResult {
        gross_sales,
        cogs,
        margin,
        margin_rate: safe_divide(margin, input.core_sales, 0.0),
        closing_inventory: input
            .opening_inventory
            .map(|opening| opening + input.inventory_purchase_cost - cogs),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoreSales {
    pub core_sales: f64,
    pub is_over_delivery: bool,
    pub over_delivery_amount: f64,
}

/// `sales - flowers - direct produce`, clamped at zero. Delivery sales are
/// flowers plus direct produce, so they are excluded as well.
pub fn calculate_core_sales(
    total_sales: f64,
    flower_sales_price: f64,
    direct_produce_sales_price: f64,
) -> CoreSales {
    let core = total_sales - flower_sales_price - direct_produce_sales_price;
    if core < 0.0 {
        CoreSales {
            core_sales: 0.0,
            is_over_delivery: true,
            over_delivery_amount: -core,
        }
    } else {
        CoreSales {
            core_sales: core,
            is_over_delivery: false,
            over_delivery_amount: 0.0,
        }
    }
}

/// `discount / (sales + discount)`. A day with markdowns but no sales is 1.0.
pub fn calculate_discount_rate(sales: f64, discount: f64) -> f64 {
    safe_divide(discount, sales + discount, 0.0)
}

/// Cost value of the price lost to markdowns:
/// `(1 - markup) * core_sales * discount_rate / (1 - discount_rate)`,
/// with the divisor forced to 1 when not positive.
pub fn calculate_discount_loss_cost(core_sales: f64, markup_rate: f64, discount_rate: f64) -> f64 {
    let divisor = 1.0 - discount_rate;
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    (1.0 - markup_rate) * core_sales * safe_divide(discount_rate, divisor, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(discount_rate: f64) -> EstimationInput {
        EstimationInput {
            core_sales: 1_000_000.0,
            discount_rate,
            markup_rate: 0.3,
            consumable_cost: 10_000.0,
            opening_inventory: Some(500_000.0),
            inventory_purchase_cost: 800_000.0,
        }
    }

    #[test]
    fn test_zero_discount_uses_core_sales() {
        let result = calculate_estimation_method(&input(0.0));
        assert_eq!(result.gross_sales, 1_000_000.0);
        assert!((result.cogs - 710_000.0).abs() < 1e-6);
        assert!((result.margin - 290_000.0).abs() < 1e-6);
        assert!((result.margin_rate - 0.29).abs() < 1e-9);
        assert!((result.closing_inventory.unwrap() - 590_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_full_discount_falls_back() {
        for rate in [1.0, 1.5] {
            let result = calculate_estimation_method(&input(rate));
            assert_eq!(result.gross_sales, 1_000_000.0);
            assert!(result.cogs.is_finite());
        }
    }

    #[test]
    fn test_discount_grosses_up_sales() {
        let result = calculate_estimation_method(&input(0.2));
        assert!((result.gross_sales - 1_250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_closing_inventory_needs_opening() {
        let mut without_opening = input(0.0);
        without_opening.opening_inventory = None;
        assert!(calculate_estimation_method(&without_opening)
            .closing_inventory
            .is_none());
    }

    #[test]
    fn test_core_sales_clamped() {
        let normal = calculate_core_sales(1000.0, 100.0, 200.0);
        assert_eq!(normal.core_sales, 700.0);
        assert!(!normal.is_over_delivery);

        let over = calculate_core_sales(100.0, 80.0, 70.0);
        assert_eq!(over.core_sales, 0.0);
        assert!(over.is_over_delivery);
        assert_eq!(over.over_delivery_amount, 50.0);
    }

    #[test]
    fn test_discount_rate() {
        assert!((calculate_discount_rate(950.0, 50.0) - 0.05).abs() < 1e-12);
        assert_eq!(calculate_discount_rate(0.0, 100.0), 1.0);
        assert_eq!(calculate_discount_rate(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_discount_loss_cost() {
        let loss = calculate_discount_loss_cost(1_000_000.0, 0.3, 0.2);
        assert!((loss - 175_000.0).abs() < 1e-6);
        let guarded = calculate_discount_loss_cost(1_000_000.0, 0.3, 1.0);
        assert!((guarded - 700_000.0).abs() < 1e-6);
    }
}
