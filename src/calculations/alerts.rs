//! Threshold rules evaluated against store results.

use crate::error::Result;
use crate::records::StoreResult;
use crate::utils::safe_divide;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rates within this distance of a threshold count as reaching it.
const RATE_TOLERANCE: f64 = 1e-9;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertRuleType {
    /// Threshold is the allowed shortfall below the target gross profit rate.
    GpRateBelowTarget,
    /// Threshold is the minimum ratio to the previous year's same day.
    DailySalesBelowPrevYear,
    ConsumableRatioAbove,
    /// Threshold is the minimum budget progress rate.
    BudgetAchievementBelow,
    DiscountRateAbove,
    DailySalesAnomaly,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlertRule {
    pub id: String,
    #[serde(rename = "type")]
    pub rule_type: AlertRuleType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub severity: AlertSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub threshold: f64,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    fn fire(&self, message: String, value: f64, threshold: f64, store: (&str, &str)) -> Alert {
        Alert {
            rule_id: self.id.clone(),
            rule_label: self.label.clone(),
            severity: self.severity,
            message,
            value,
            threshold,
            store_id: store.0.to_string(),
            store_name: store.1.to_string(),
            day: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: String,
    pub rule_label: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub store_id: String,
    pub store_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

fn rule(
    id: &str,
    rule_type: AlertRuleType,
    label: &str,
    description: &str,
    severity: AlertSeverity,
    threshold: f64,
) -> AlertRule {
    AlertRule {
        id: id.to_string(),
        rule_type,
        label: label.to_string(),
        description: description.to_string(),
        severity,
        enabled: true,
        threshold,
    }
}

pub fn default_alert_rules() -> Vec<AlertRule> {
    vec![
        rule(
            "gp-rate-target",
            AlertRuleType::GpRateBelowTarget,
            "Gross profit rate below target",
            "Gross profit rate is more than 2pt under the target",
            AlertSeverity::Critical,
            0.02,
        ),
        rule(
            "daily-sales-prev-year",
            AlertRuleType::DailySalesBelowPrevYear,
            "Daily sales under 80% of last year",
            "Daily sales are below 80% of the same day last year",
            AlertSeverity::Warning,
            0.80,
        ),
        rule(
            "consumable-ratio",
            AlertRuleType::ConsumableRatioAbove,
            "Consumable ratio too high",
            "Consumable cost as a share of sales exceeds the threshold",
            AlertSeverity::Warning,
            0.03,
        ),
        rule(
            "budget-achievement",
            AlertRuleType::BudgetAchievementBelow,
            "Budget progress behind",
            "Sales are behind the budget accrued so far",
            AlertSeverity::Warning,
            0.90,
        ),
        rule(
            "discount-rate",
            AlertRuleType::DiscountRateAbove,
            "Discount rate too high",
            "Markdowns as a share of sales exceed the threshold",
            AlertSeverity::Info,
            0.05,
        ),
    ]
}

/// Parses a JSON array of rules.
pub fn alert_rules_from_json(json: &str) -> Result<Vec<AlertRule>> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Clone, Copy)]
pub struct AlertOptions<'a> {
    pub target_gross_profit_rate: f64,
    pub prev_year_daily_sales: Option<&'a BTreeMap<u32, f64>>,
}

fn pct(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Evaluates every enabled rule against one store, in rule order.
pub fn evaluate_alerts(
    store_id: &str,
    store_name: &str,
    result: &StoreResult,
    rules: &[AlertRule],
    options: &AlertOptions<'_>,
) -> Vec<Alert> {
    let store = (store_id, store_name);
    let mut alerts = Vec::new();

    for rule in rules.iter().filter(|r| r.enabled) {
        match rule.rule_type {
            AlertRuleType::GpRateBelowTarget => {
                let gp_rate = result
                    .inv_method_gross_profit_rate
                    .unwrap_or(result.est_method_margin_rate);
                let target = options.target_gross_profit_rate;
                let diff = target - gp_rate;
                if diff > rule.threshold - RATE_TOLERANCE {
                    let message = format!(
                        "{store_name}: gross profit rate {} (target {}, {:.1}pt short)",
                        pct(gp_rate),
                        pct(target),
                        diff * 100.0
                    );
                    alerts.push(rule.fire(message, gp_rate, target - rule.threshold, store));
                }
            }
            AlertRuleType::DailySalesBelowPrevYear => {
                let Some(prev_year) = options.prev_year_daily_sales else {
                    continue;
                };
                for (day, record) in &result.daily {
                    let prev = match prev_year.get(day) {
                        Some(v) if *v != 0.0 => *v,
                        _ => continue,
                    };
                    let ratio = safe_divide(record.sales, prev, 1.0);
                    if ratio < rule.threshold {
                        let message = format!(
                            "{store_name} day {day}: {:.0}% of last year ({} / {})",
                            ratio * 100.0,
                            record.sales,
                            prev
                        );
                        let mut alert = rule.fire(message, ratio, rule.threshold, store);
                        alert.day = Some(*day);
                        alerts.push(alert);
                    }
                }
            }
            AlertRuleType::ConsumableRatioAbove => {
                if result.total_sales == 0.0 {
                    continue;
                }
                let consumable: f64 = result.daily.values().map(|r| r.consumable.cost).sum();
                let ratio = safe_divide(consumable, result.total_sales, 0.0);
                if ratio > rule.threshold {
                    let message = format!(
                        "{store_name}: consumable ratio {} (threshold {})",
                        pct(ratio),
                        pct(rule.threshold)
                    );
                    alerts.push(rule.fire(message, ratio, rule.threshold, store));
                }
            }
            AlertRuleType::BudgetAchievementBelow => {
                let progress = result.budget_progress_rate;
                if progress == 0.0 {
                    continue;
                }
                if progress < rule.threshold {
                    let message = format!(
                        "{store_name}: budget progress {} (threshold {:.0}%)",
                        pct(progress),
                        rule.threshold * 100.0
                    );
                    alerts.push(rule.fire(message, progress, rule.threshold, store));
                }
            }
            AlertRuleType::DiscountRateAbove => {
                if result.total_sales == 0.0 {
                    continue;
                }
                let discount: f64 = result.daily.values().map(|r| r.discount_amount).sum();
                let rate = safe_divide(discount, result.total_sales, 0.0);
                if rate > rule.threshold {
                    let message = format!(
                        "{store_name}: discount rate {} (threshold {})",
                        pct(rate),
                        pct(rule.threshold)
                    );
                    alerts.push(rule.fire(message, rate, rule.threshold, store));
                }
            }
            AlertRuleType::DailySalesAnomaly | AlertRuleType::Custom => {}
        }
    }
    alerts
}

/// Evaluates all stores and orders the alerts critical first. Within one
/// severity, alerts keep store order and then rule order.
pub fn evaluate_all_store_alerts(
    results: &BTreeMap<String, StoreResult>,
    store_names: &BTreeMap<String, String>,
    rules: &[AlertRule],
    target_gross_profit_rate: f64,
    prev_year_daily_sales: Option<&BTreeMap<String, BTreeMap<u32, f64>>>,
) -> Vec<Alert> {
    let mut all: Vec<Alert> = results
        .iter()
        .flat_map(|(store_id, result)| {
            let name = store_names.get(store_id).map_or(store_id.as_str(), String::as_str);
            let options = AlertOptions {
                target_gross_profit_rate,
                prev_year_daily_sales: prev_year_daily_sales.and_then(|p| p.get(store_id)),
            };
            evaluate_alerts(store_id, name, result, rules, &options)
        })
        .collect();
    all.sort_by_key(|a| a.severity);
    all
}
