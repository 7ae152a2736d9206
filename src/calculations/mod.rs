//! Pure calculations over assembled store results.

pub mod advanced_forecast;
pub mod aggregation;
pub mod alerts;
pub mod budget;
pub mod estimation;
pub mod forecast;
pub mod inventory;
pub mod pin_intervals;
pub mod trend;

pub use advanced_forecast::{
    calculate_month_end_projection, calculate_wma, linear_regression, project_dow_adjusted,
    ConfidenceInterval, LinearRegressionResult, MonthEndProjection, WmaEntry, DEFAULT_WMA_WINDOW,
};
pub use aggregation::{
    aggregate_store_results, aggregate_stores, sum_nullable_values, sum_store_values,
    weighted_average_by_sales, AggregatedResult, AGGREGATE_STORE_ID,
};
pub use alerts::{
    alert_rules_from_json, default_alert_rules, evaluate_alerts, evaluate_all_store_alerts, Alert,
    AlertOptions, AlertRule, AlertRuleType, AlertSeverity,
};
pub use budget::{calculate_budget_analysis, BudgetAnalysisInput, BudgetAnalysisResult};
pub use estimation::{
    calculate_core_sales, calculate_discount_loss_cost, calculate_discount_rate,
    calculate_estimation_method, CoreSales, EstimationInput, EstimationResult,
};
pub use forecast::{
    calculate_day_of_week_averages, calculate_forecast, calculate_std_dev,
    calculate_weekly_summaries, detect_anomalies, week_ranges, AnomalyDetectionResult,
    DayOfWeekAverage, ForecastInput, ForecastResult, WeekRange, WeeklySummary,
    DEFAULT_ANOMALY_THRESHOLD,
};
pub use inventory::{calculate_inventory_method, InventoryMethodInput, InventoryMethodResult};
pub use pin_intervals::{calculate_pin_intervals, PinInterval};
pub use trend::{analyze_trend, MonthlyDataPoint, TrendAnalysisResult, TrendDirection};
