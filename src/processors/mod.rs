//! One processor per source kind. Each turns raw rows into typed per-store,
//! per-day entries; none of them fail on bad cells, they skip them.

pub mod budget;
pub mod category_time;
pub mod consumables;
pub mod discount;
pub mod purchase;
pub mod sales;
pub mod settings_file;
pub mod special_sales;
pub mod transfer;

pub use budget::process_budget;
pub use category_time::{merge_category_time_sales, process_category_time_sales};
pub use consumables::{merge_consumable_data, process_consumables, TARGET_ACCOUNT_CODE};
pub use discount::{discount_to_sales, process_discount};
pub use purchase::{extract_stores_from_purchase, extract_suppliers_from_purchase, process_purchase};
pub use sales::{extract_stores_from_sales, process_sales};
pub use settings_file::process_settings;
pub use special_sales::process_special_sales;
pub use transfer::{process_inter_store_in, process_inter_store_out};

use crate::layout::{parse_store_header, ColumnLayout};
use crate::schema::{Rows, Store};
use std::collections::BTreeMap;

/// Stores labelled in the header row of `layout`; the first label for an id wins.
pub(crate) fn extract_stores(rows: &Rows, layout: &ColumnLayout) -> BTreeMap<String, Store> {
    let header = layout.header(rows);
    let mut stores = BTreeMap::new();
    for col in layout.group_columns(rows, |cell| parse_store_header(cell).is_some()) {
        if let Some(store) = parse_store_header(&header[col]) {
            stores.entry(store.id.clone()).or_insert(store);
        }
    }
    stores
}

/// Store ids of a header row paired with their group start columns.
pub(crate) fn store_columns(rows: &Rows, layout: &ColumnLayout) -> Vec<(usize, String)> {
    let header = layout.header(rows);
    layout
        .group_columns(rows, |cell| parse_store_header(cell).is_some())
        .into_iter()
        .filter_map(|col| parse_store_header(&header[col]).map(|store| (col, store.id)))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::schema::{Cell, Row};

    /// Builds a row from text cells; `""` becomes an empty cell.
    pub fn text_row(cells: &[&str]) -> Row {
        cells
            .iter()
            .map(|c| if c.is_empty() { Cell::Empty } else { Cell::from(*c) })
            .collect()
    }

    /// A dated data row whose values start at column 3.
    pub fn data_row(date: &str, values: &[f64]) -> Row {
        let mut row = vec![Cell::from(date), Cell::Empty, Cell::Empty];
        row.extend(values.iter().map(|v| Cell::Number(*v)));
        row
    }
}
