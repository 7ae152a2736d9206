//! # Retail Ledger Builder
//!
//! A library for turning a month of retail back-office exports (purchases,
//! sales, markdowns, transfers, special sales, consumables, budgets and
//! inventory counts) into per-store daily records, and for computing profit,
//! budget, forecast and alert models over them.
//!
//! ## Core Concepts
//!
//! - **Cells**: every file arrives as a grid of [`Cell`]s from an external
//!   [`TabularReader`]; this crate never decodes file formats itself
//! - **Imported Data**: the running [`ImportedData`] aggregate, refolded
//!   file by file. Most sources overwrite per store/day, consumables add up
//! - **Store Results**: the monthly [`StoreResult`] per store, built from
//!   daily records, plus an all-store aggregate
//! - **Two Profit Methods**: the inventory method is the accounting gross
//!   profit; the estimation method only derives an estimated closing
//!   inventory to compare against the physical count
//!
//! ## Example
//!
//! ```rust,ignore
//! use retail_ledger_builder::*;
//! use chrono::NaiveDate;
//!
//! let settings = AppSettings::for_date(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
//! let reader = StaticReader::new()
//!     .with_file("2_仕入.xlsx", purchase_rows)
//!     .with_file("1_売上売変.xlsx", sales_rows);
//! let files = vec![
//!     ImportFile::new("2_仕入.xlsx", Vec::new()),
//!     ImportFile::new("1_売上売変.xlsx", Vec::new()),
//! ];
//!
//! let (summary, data) =
//!     process_dropped_files(&files, &reader, &settings, &ImportedData::new(), None, None).await;
//! let report = process_ledger(&data, &settings)?;
//! for alert in &report.alerts {
//!     println!("{:?} {}", alert.severity, alert.message);
//! }
//! ```

pub mod calculations;
pub mod dates;
pub mod detector;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod layout;
pub mod processors;
pub mod records;
pub mod schema;
pub mod settings;
pub mod utils;

pub use calculations::*;
pub use dates::{day_of_month, from_excel_serial, parse_date};
pub use detector::{data_type_name, detect_file_type, DetectionConfidence, DetectionResult};
pub use engine::{
    assemble_store_result, build_daily_records, build_store_results, MonthlyAccumulator,
};
pub use error::{ImportError, ImportErrorKind, LedgerError, Result};
pub use ingestion::*;
pub use records::*;
pub use schema::*;
pub use settings::{AppSettings, CustomCategory};
pub use utils::{days_in_month, safe_divide, safe_number};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything computed for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub year: i32,
    pub month: u32,
    pub stores: BTreeMap<String, StoreResult>,
    /// Merged all-store result; `None` when no store was detected.
    pub aggregate: Option<StoreResult>,
    pub summary: AggregatedResult,
    pub alerts: Vec<Alert>,
    pub validation: Vec<ValidationMessage>,
}

pub struct LedgerProcessor;

impl LedgerProcessor {
    pub fn process(data: &ImportedData, settings: &AppSettings) -> Result<LedgerReport> {
        Self::process_with_rules(data, settings, &default_alert_rules())
    }

    pub fn process_with_rules(
        data: &ImportedData,
        settings: &AppSettings,
        rules: &[AlertRule],
    ) -> Result<LedgerReport> {
        settings.validate()?;

        info!(
            "Processing {}-{:02} for {} stores",
            settings.target_year,
            settings.target_month,
            data.stores.len()
        );

        let validation = validate_imported_data(data);
        for message in &validation {
            debug!("Validation {:?}: {}", message.level, message.message);
        }

        let stores = build_store_results(data, settings);
        let results: Vec<StoreResult> = stores.values().cloned().collect();
        let days = days_in_month(settings.target_year, settings.target_month);

        let aggregate = if results.is_empty() {
            None
        } else {
            Some(aggregate_store_results(&results, days)?)
        };
        let summary = aggregate_stores(&results);

        let names: BTreeMap<String, String> = data
            .stores
            .iter()
            .map(|(id, store)| (id.clone(), store.name.clone()))
            .collect();
        let prev_year = prev_year_daily_sales(data);
        let alerts = evaluate_all_store_alerts(
            &stores,
            &names,
            rules,
            settings.target_gross_profit_rate,
            Some(&prev_year),
        );

        info!(
            "Built {} store results with {} alerts",
            stores.len(),
            alerts.len()
        );

        Ok(LedgerReport {
            year: settings.target_year,
            month: settings.target_month,
            stores,
            aggregate,
            summary,
            alerts,
            validation,
        })
    }
}

/// Previous-year daily sales per store, as the alert rules consume them.
pub fn prev_year_daily_sales(data: &ImportedData) -> BTreeMap<String, BTreeMap<u32, f64>> {
    data.prev_year_sales
        .iter()
        .fold(BTreeMap::new(), |mut acc, (store_id, day, entry)| {
            acc.entry(store_id.clone())
                .or_insert_with(BTreeMap::new)
                .insert(day, entry.sales);
            acc
        })
}

pub fn process_ledger(data: &ImportedData, settings: &AppSettings) -> Result<LedgerReport> {
    LedgerProcessor::process(data, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str, name: &str) -> Store {
        Store {
            id: id.to_string(),
            code: format!("{:0>4}", id),
            name: name.to_string(),
        }
    }

    fn sample_data() -> ImportedData {
        let mut data = ImportedData::new();
        data.stores.insert("1".to_string(), store("1", "North"));
        data.stores.insert("2".to_string(), store("2", "South"));
        for day in 1..=10 {
            data.sales.insert("1", day, SalesDayEntry { sales: 100_000.0 });
            data.sales.insert("2", day, SalesDayEntry { sales: 50_000.0 });
            data.purchase.insert(
                "1",
                day,
                PurchaseDayEntry {
                    total: CostPricePair::new(70_000.0, 100_000.0),
                    ..PurchaseDayEntry::default()
                },
            );
        }
        data.settings.insert(
            "1".to_string(),
            InventoryConfig {
                store_id: "1".to_string(),
                opening_inventory: Some(500_000.0),
                closing_inventory: Some(400_000.0),
                gross_profit_budget: None,
            },
        );
        data
    }

    #[test]
    fn test_end_to_end_processing() {
        let data = sample_data();
        let settings = AppSettings::for_month(2026, 2);
        let report = process_ledger(&data, &settings).unwrap();

        assert_eq!(report.stores.len(), 2);
        let north = &report.stores["1"];
        // cogs = 500k + 700k - 400k
        assert_eq!(north.inv_method_cogs, Some(800_000.0));
        assert!((north.inv_method_gross_profit_rate.unwrap() - 0.2).abs() < 1e-12);

        let aggregate = report.aggregate.as_ref().unwrap();
        assert_eq!(aggregate.store_id, AGGREGATE_STORE_ID);
        assert_eq!(aggregate.total_sales, 1_500_000.0);
        assert_eq!(report.summary.total_sales, 1_500_000.0);
        assert!((report.summary.inv_method_gross_profit_rate.unwrap() - 0.2).abs() < 1e-12);

        // North misses the 25% target by 5pt
        let gp_alerts: Vec<_> = report
            .alerts
            .iter()
            .filter(|a| a.rule_id == "gp-rate-target")
            .collect();
        assert!(gp_alerts.iter().any(|a| a.store_name == "North"));
        assert_eq!(report.alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = AppSettings::for_month(2026, 2);
        settings.target_month = 13;
        assert!(matches!(
            process_ledger(&sample_data(), &settings),
            Err(LedgerError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_empty_data_has_no_aggregate() {
        let settings = AppSettings::for_month(2026, 2);
        let report = process_ledger(&ImportedData::new(), &settings).unwrap();
        assert!(report.aggregate.is_none());
        assert!(report.alerts.is_empty());
        assert!(has_validation_errors(&report.validation));
    }

    #[test]
    fn test_prev_year_daily_sales_by_store() {
        let mut data = ImportedData::new();
        data.prev_year_sales.insert("1", 3, SalesDayEntry { sales: 42.0 });
        let prev = prev_year_daily_sales(&data);
        assert_eq!(prev["1"][&3], 42.0);
    }
}
