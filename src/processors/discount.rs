use crate::dates::parse_date;
use crate::layout::{field, ColumnLayout};
use crate::schema::{cell_at, DiscountData, DiscountDayEntry, Rows, SalesData, SalesDayEntry};
use crate::utils::safe_number;
use chrono::Datelike;
use log::debug;

/// Sales/discount pairs per store from column 3, data from row 2.
const DISCOUNT_LAYOUT: ColumnLayout = ColumnLayout {
    header_row: 0,
    first_group_col: 3,
    default_stride: 2,
    data_start_row: 2,
    min_rows: 3,
};

/// Daily sales and absolute markdown per store.
///
/// Cells with zero sales are skipped. When `target_month` is given, rows
/// dated in any other month are dropped; previous-year exports often run
/// into the first day of the following month.
pub fn process_discount(rows: &Rows, target_month: Option<u32>) -> DiscountData {
    let mut result = DiscountData::new();
    if !DISCOUNT_LAYOUT.has_enough_rows(rows) {
        return result;
    }

    let columns = super::store_columns(rows, &DISCOUNT_LAYOUT);
    for row in DISCOUNT_LAYOUT.data_rows(rows) {
        let Some(date) = parse_date(cell_at(row, 0), None) else {
            continue;
        };
        if target_month.is_some_and(|month| date.month() != month) {
            continue;
        }

        for (col, store_id) in &columns {
            let sales = safe_number(field(row, *col, 0));
            let discount = safe_number(field(row, *col, 1)).abs();
            if sales == 0.0 {
                continue;
            }
            result.insert(store_id, date.day(), DiscountDayEntry { sales, discount });
        }
    }

    debug!(
        "discount: {} stores, filter month {:?}",
        columns.len(),
        target_month
    );
    result
}

/// Sales slice of a combined sales/discount export.
pub fn discount_to_sales(discount: &DiscountData) -> SalesData {
    let mut sales = SalesData::new();
    for (store_id, day, entry) in discount.iter() {
        sales.insert(store_id, day, SalesDayEntry { sales: entry.sales });
    }
    sales
}
