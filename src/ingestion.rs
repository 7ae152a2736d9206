//! Import service: structural checks, per-file dispatch into the running
//! [`ImportedData`] aggregate, batch import and post-import validation.

use crate::detector::{data_type_name, detect_file_type};
use crate::error::ImportError;
use crate::processors::{
    discount_to_sales, extract_stores_from_purchase, extract_stores_from_sales,
    extract_suppliers_from_purchase, merge_category_time_sales, merge_consumable_data,
    process_budget, process_category_time_sales, process_consumables, process_discount,
    process_inter_store_in, process_inter_store_out, process_purchase, process_sales,
    process_settings, process_special_sales,
};
use crate::schema::{DataType, ImportedData, Rows, ValidationLevel, ValidationMessage};
use crate::settings::AppSettings;
use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A file handed over by the caller: its name and raw bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Turns file bytes into a cell grid. Decoding spreadsheet and CSV formats
/// lives outside this crate behind this trait.
pub trait TabularReader {
    fn read<'a>(&'a self, file: &'a ImportFile) -> BoxFuture<'a, Result<Rows, ImportError>>;
}

/// Reader over rows the caller already holds, looked up by file name.
#[derive(Debug, Clone, Default)]
pub struct StaticReader {
    files: BTreeMap<String, Rows>,
}

impl StaticReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, rows: Rows) -> Self {
        self.files.insert(name.into(), rows);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rows: Rows) {
        self.files.insert(name.into(), rows);
    }
}

impl TabularReader for StaticReader {
    fn read<'a>(&'a self, file: &'a ImportFile) -> BoxFuture<'a, Result<Rows, ImportError>> {
        let result = self
            .files
            .get(&file.name)
            .cloned()
            .ok_or_else(|| ImportError::ParseError {
                filename: file.name.clone(),
                details: "no rows registered for this file".to_string(),
            });
        Box::pin(futures::future::ready(result))
    }
}

struct StructuralRule {
    min_rows: usize,
    min_cols: usize,
    label: &'static str,
}

fn structural_rule(data_type: DataType) -> StructuralRule {
    let (min_rows, min_cols, label) = match data_type {
        DataType::Purchase => (3, 4, "purchase data"),
        DataType::Sales => (4, 4, "sales data"),
        DataType::Discount => (3, 3, "discount data"),
        DataType::SalesDiscount => (3, 3, "sales/discount data"),
        DataType::PrevYearSalesDiscount => (3, 3, "previous-year sales/discount data"),
        DataType::InitialSettings => (2, 2, "initial settings data"),
        DataType::Budget => (2, 2, "budget data"),
        DataType::InterStoreIn => (2, 3, "inter-store inbound data"),
        DataType::InterStoreOut => (2, 3, "inter-store outbound data"),
        DataType::Flowers => (2, 2, "flowers data"),
        DataType::DirectProduce => (2, 2, "direct produce data"),
        DataType::Consumables => (2, 2, "consumables data"),
        DataType::CategoryTimeSales => (4, 5, "category time sales data"),
    };
    StructuralRule {
        min_rows,
        min_cols,
        label,
    }
}

/// Rejects grids too small to hold the given data type: too few rows, no row
/// wide enough, or nothing but blanks after the first row.
pub fn validate_raw_rows(
    data_type: DataType,
    rows: &Rows,
    filename: &str,
) -> Result<(), ImportError> {
    let rule = structural_rule(data_type);
    let invalid = |details: String| ImportError::InvalidFormat {
        filename: filename.to_string(),
        details,
    };

    if rows.len() < rule.min_rows {
        return Err(invalid(format!(
            "{} needs at least {} rows, found {}",
            rule.label,
            rule.min_rows,
            rows.len()
        )));
    }

    // header rows are often label-only, so width is judged on the widest row
    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if max_cols < rule.min_cols {
        return Err(invalid(format!(
            "{} needs at least {} columns, widest row has {}",
            rule.label, rule.min_cols, max_cols
        )));
    }

    let has_data = rows
        .iter()
        .skip(1)
        .any(|row| row.iter().any(|cell| !cell.is_blank()));
    if !has_data {
        return Err(invalid(format!("{} contains no data rows", rule.label)));
    }
    Ok(())
}

/// Folds one file's rows into a copy of `current`.
///
/// Consumables accumulate; category time sales merge by record key; every
/// other source overwrites matching store/day entries (settings and budget
/// per store).
pub fn process_file_data(
    data_type: DataType,
    rows: &Rows,
    filename: &str,
    current: &ImportedData,
    settings: &AppSettings,
) -> Result<ImportedData, ImportError> {
    validate_raw_rows(data_type, rows, filename)?;

    let mut next = current.clone();
    match data_type {
        DataType::Purchase => {
            next.stores.extend(extract_stores_from_purchase(rows));
            next.suppliers.extend(extract_suppliers_from_purchase(rows));
            let known: BTreeSet<String> = next.stores.keys().cloned().collect();
            next.purchase.overlay(&process_purchase(rows, &known));
        }
        DataType::Sales => {
            next.stores.extend(extract_stores_from_sales(rows));
            next.sales.overlay(&process_sales(rows));
        }
        DataType::Discount => {
            next.discount.overlay(&process_discount(rows, None));
        }
        DataType::SalesDiscount => {
            next.stores.extend(extract_stores_from_sales(rows));
            let discount = process_discount(rows, None);
            next.sales.overlay(&discount_to_sales(&discount));
            next.discount.overlay(&discount);
        }
        DataType::PrevYearSalesDiscount => {
            let discount = process_discount(rows, Some(settings.target_month));
            next.prev_year_sales.overlay(&discount_to_sales(&discount));
            next.prev_year_discount.overlay(&discount);
        }
        DataType::InitialSettings => {
            next.settings.extend(process_settings(rows));
        }
        DataType::Budget => {
            next.budget.extend(process_budget(rows));
        }
        DataType::InterStoreIn => {
            next.inter_store_in.overlay(&process_inter_store_in(rows));
        }
        DataType::InterStoreOut => {
            next.inter_store_out.overlay(&process_inter_store_out(rows));
        }
        DataType::Flowers => {
            next.flowers
                .overlay(&process_special_sales(rows, settings.flower_cost_rate));
        }
        DataType::DirectProduce => {
            next.direct_produce
                .overlay(&process_special_sales(rows, settings.direct_produce_cost_rate));
        }
        DataType::Consumables => {
            let incoming = process_consumables(rows, filename);
            next.consumables = merge_consumable_data(&current.consumables, &incoming);
        }
        DataType::CategoryTimeSales => {
            let incoming = process_category_time_sales(rows, Some(settings.target_month));
            next.category_time_sales =
                merge_category_time_sales(&current.category_time_sales, &incoming);
        }
    }

    debug!("merged {} as {}", filename, data_type);
    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileImportResult {
    pub ok: bool,
    pub filename: String,
    #[serde(rename = "type")]
    pub data_type: Option<DataType>,
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub results: Vec<FileImportResult>,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Receives `(current, total, filename)` before each file is read.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(usize, usize, &str);

async fn read_and_classify(
    file: &ImportFile,
    reader: &dyn TabularReader,
    override_type: Option<DataType>,
) -> Result<(Rows, DataType, String), ImportError> {
    let rows = reader.read(file).await?;
    if rows.is_empty() {
        return Err(ImportError::InvalidFormat {
            filename: file.name.clone(),
            details: "file is empty".to_string(),
        });
    }

    if let Some(data_type) = override_type {
        return Ok((rows, data_type, data_type_name(data_type).to_string()));
    }

    let detection = detect_file_type(&file.name, &rows);
    match detection.data_type {
        Some(data_type) => {
            let name = detection
                .rule_name
                .unwrap_or_else(|| data_type_name(data_type));
            Ok((rows, data_type, name.to_string()))
        }
        None => Err(ImportError::UnknownType {
            filename: file.name.clone(),
            details: "could not determine the data type".to_string(),
        }),
    }
}

/// Imports files one at a time, left to right, into a copy of `current`.
///
/// A failing file is recorded in the summary and leaves the aggregate as it
/// was; the remaining files are still processed. With `override_type` set,
/// detection is skipped and every file is treated as that type.
pub async fn process_dropped_files(
    files: &[ImportFile],
    reader: &dyn TabularReader,
    settings: &AppSettings,
    current: &ImportedData,
    override_type: Option<DataType>,
    mut progress: Option<ProgressCallback<'_>>,
) -> (ImportSummary, ImportedData) {
    let mut data = current.clone();
    let mut results = Vec::with_capacity(files.len());

    for (idx, file) in files.iter().enumerate() {
        if let Some(callback) = progress.as_deref_mut() {
            callback(idx + 1, files.len(), &file.name);
        }

        let outcome = match read_and_classify(file, reader, override_type).await {
            Ok((rows, data_type, type_name)) => {
                process_file_data(data_type, &rows, &file.name, &data, settings)
                    .map(|next| (next, data_type, type_name))
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok((next, data_type, type_name)) => {
                info!("Imported {} as {}", file.name, type_name);
                data = next;
                results.push(FileImportResult {
                    ok: true,
                    filename: file.name.clone(),
                    data_type: Some(data_type),
                    type_name: Some(type_name),
                    error: None,
                });
            }
            Err(err) => {
                warn!("Skipping {}: {}", file.name, err);
                results.push(FileImportResult {
                    ok: false,
                    filename: file.name.clone(),
                    data_type: None,
                    type_name: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let success_count = results.iter().filter(|r| r.ok).count();
    let failure_count = results.len() - success_count;
    info!(
        "Batch import finished: {} succeeded, {} failed",
        success_count, failure_count
    );

    (
        ImportSummary {
            results,
            success_count,
            failure_count,
        },
        data,
    )
}

/// Completeness check over the aggregate. Advisory only: never fails.
pub fn validate_imported_data(data: &ImportedData) -> Vec<ValidationMessage> {
    let mut messages = Vec::new();
    let store_count = data.stores.len();

    if data.purchase.is_empty() {
        messages.push(ValidationMessage::new(
            ValidationLevel::Error,
            "No purchase data has been imported",
        ));
    }
    if data.sales.is_empty() {
        messages.push(ValidationMessage::new(
            ValidationLevel::Error,
            "No sales data has been imported",
        ));
    }

    if store_count == 0 {
        messages.push(ValidationMessage::new(
            ValidationLevel::Warning,
            "No stores were detected",
        ));
    }

    let settings_count = data.settings.len();
    if settings_count == 0 {
        messages.push(ValidationMessage::new(
            ValidationLevel::Warning,
            "No inventory settings. Import an initial settings file or enter them manually",
        ));
    } else if settings_count < store_count {
        let mut message = ValidationMessage::new(
            ValidationLevel::Warning,
            format!(
                "Some stores lack inventory settings ({}/{})",
                settings_count, store_count
            ),
        );
        message.details = data
            .stores
            .keys()
            .filter(|id| !data.settings.contains_key(*id))
            .cloned()
            .collect();
        messages.push(message);
    }

    if data.budget.is_empty() {
        messages.push(ValidationMessage::new(
            ValidationLevel::Info,
            "No budget data. Import a budget file for budget analysis",
        ));
    }
    if data.discount.is_empty() {
        messages.push(ValidationMessage::new(
            ValidationLevel::Info,
            "No discount data. Import a discount file for the estimation method",
        ));
    }

    messages
}

pub fn has_validation_errors(messages: &[ValidationMessage]) -> bool {
    messages.iter().any(|m| m.level == ValidationLevel::Error)
}
