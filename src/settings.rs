use crate::error::{LedgerError, Result};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound accepted for the flower / direct-produce cost rates.
pub const COST_RATE_MAX: f64 = 1.2;

/// Buyer-assigned supplier grouping, serialized with the labels used in the
/// back-office exports.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
pub enum CustomCategory {
    #[serde(rename = "市場仕入")]
    MarketPurchase,
    #[serde(rename = "LFC")]
    Lfc,
    #[serde(rename = "サラダ")]
    Salad,
    #[serde(rename = "加工品")]
    Processed,
    #[serde(rename = "消耗品")]
    Consumables,
    #[serde(rename = "直伝")]
    DirectDelivery,
    #[serde(rename = "その他")]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[schemars(description = "Calendar year of the month being processed")]
    pub target_year: i32,

    #[schemars(description = "Month being processed (1 = January, 12 = December)")]
    pub target_month: u32,

    #[serde(default = "default_target_gross_profit_rate")]
    #[schemars(description = "Gross profit rate the stores are expected to reach. Default 0.25")]
    pub target_gross_profit_rate: f64,

    /// Display band for the host's rate highlighting. Alert evaluation uses
    /// `target_gross_profit_rate` and each rule's own threshold instead.
    #[serde(default = "default_warning_threshold")]
    #[schemars(
        description = "Rate below which the host highlights a store, display only. Default 0.23"
    )]
    pub warning_threshold: f64,

    #[serde(default = "default_flower_cost_rate")]
    #[schemars(description = "Cost-to-price rate applied to flower sales. Default 0.80")]
    pub flower_cost_rate: f64,

    #[serde(default = "default_direct_produce_cost_rate")]
    #[schemars(description = "Cost-to-price rate applied to direct produce sales. Default 0.85")]
    pub direct_produce_cost_rate: f64,

    #[serde(default = "default_markup_rate")]
    #[schemars(
        description = "Markup rate used without any purchase or transfer price. Default 0.26"
    )]
    pub default_markup_rate: f64,

    #[serde(default = "default_budget")]
    #[schemars(description = "Sales budget for stores without a budget file. Default 6,450,000")]
    pub default_budget: f64,

    #[serde(default)]
    #[schemars(description = "Supplier code to custom category assignments")]
    pub supplier_category_map: BTreeMap<String, CustomCategory>,
}

fn default_target_gross_profit_rate() -> f64 {
    0.25
}

fn default_warning_threshold() -> f64 {
    0.23
}

fn default_flower_cost_rate() -> f64 {
    0.80
}

fn default_direct_produce_cost_rate() -> f64 {
    0.85
}

fn default_markup_rate() -> f64 {
    0.26
}

fn default_budget() -> f64 {
    6_450_000.0
}

impl AppSettings {
    /// Settings targeting the month containing `today`, every other option at its default.
    pub fn for_date(today: NaiveDate) -> Self {
        Self::for_month(today.year(), today.month())
    }

    pub fn for_month(year: i32, month: u32) -> Self {
        Self {
            target_year: year,
            target_month: month,
            target_gross_profit_rate: default_target_gross_profit_rate(),
            warning_threshold: default_warning_threshold(),
            flower_cost_rate: default_flower_cost_rate(),
            direct_produce_cost_rate: default_direct_produce_cost_rate(),
            default_markup_rate: default_markup_rate(),
            default_budget: default_budget(),
            supplier_category_map: BTreeMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: AppSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.target_month) {
            return Err(LedgerError::InvalidSettings(format!(
                "targetMonth must be between 1 and 12, got {}",
                self.target_month
            )));
        }

        let rates = [
            ("targetGrossProfitRate", self.target_gross_profit_rate),
            ("warningThreshold", self.warning_threshold),
            ("defaultMarkupRate", self.default_markup_rate),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(LedgerError::InvalidSettings(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        let cost_rates = [
            ("flowerCostRate", self.flower_cost_rate),
            ("directProduceCostRate", self.direct_produce_cost_rate),
        ];
        for (name, value) in cost_rates {
            if !(0.0..=COST_RATE_MAX).contains(&value) {
                return Err(LedgerError::InvalidSettings(format!(
                    "{} must be between 0 and {}, got {}",
                    name, COST_RATE_MAX, value
                )));
            }
        }

        if self.default_budget.is_nan() || self.default_budget < 0.0 {
            return Err(LedgerError::InvalidSettings(format!(
                "defaultBudget must not be negative, got {}",
                self.default_budget
            )));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AppSettings)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
