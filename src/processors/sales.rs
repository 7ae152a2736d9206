use crate::dates::day_of_month;
use crate::layout::{field, ColumnLayout};
use crate::schema::{cell_at, Rows, SalesData, SalesDayEntry, Store};
use crate::utils::safe_number;
use log::debug;
use std::collections::BTreeMap;

const SALES_LAYOUT: ColumnLayout = ColumnLayout {
    header_row: 0,
    first_group_col: 3,
    default_stride: 2,
    data_start_row: 3,
    min_rows: 4,
};

/// Daily sales per store. Zero-sales days are kept so closed days stay visible.
pub fn process_sales(rows: &Rows) -> SalesData {
    let mut result = SalesData::new();
    if !SALES_LAYOUT.has_enough_rows(rows) {
        return result;
    }

    let columns = super::store_columns(rows, &SALES_LAYOUT);
    for row in SALES_LAYOUT.data_rows(rows) {
        let Some(day) = day_of_month(cell_at(row, 0), None) else {
            continue;
        };
        for (col, store_id) in &columns {
            let sales = safe_number(field(row, *col, 0));
            result.insert(store_id, day, SalesDayEntry { sales });
        }
    }

    debug!("sales: {} stores", columns.len());
    result
}

pub fn extract_stores_from_sales(rows: &Rows) -> BTreeMap<String, Store> {
    super::extract_stores(rows, &SALES_LAYOUT)
}
