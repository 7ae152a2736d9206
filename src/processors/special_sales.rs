use crate::dates::day_of_month;
use crate::layout::{field, ColumnLayout};
use crate::schema::{cell_at, Rows, SpecialSalesData};
use crate::utils::{round_half_up, safe_number};
use log::debug;

/// Flowers and direct produce share one export shape: a price column per store.
const SPECIAL_SALES_LAYOUT: ColumnLayout = ColumnLayout {
    header_row: 0,
    first_group_col: 3,
    default_stride: 2,
    data_start_row: 3,
    min_rows: 4,
};

/// Daily price per store with cost derived as `round(price * cost_rate)`.
pub fn process_special_sales(rows: &Rows, cost_rate: f64) -> SpecialSalesData {
    let mut result = SpecialSalesData::new();
    if !SPECIAL_SALES_LAYOUT.has_enough_rows(rows) {
        return result;
    }

    let columns = super::store_columns(rows, &SPECIAL_SALES_LAYOUT);
    for row in SPECIAL_SALES_LAYOUT.data_rows(rows) {
        let Some(day) = day_of_month(cell_at(row, 0), None) else {
            continue;
        };
        for (col, store_id) in &columns {
            let price = safe_number(field(row, *col, 0));
            if price == 0.0 {
                continue;
            }
            let entry = result.entry_or_default(store_id, day);
            entry.price += price;
            entry.cost += round_half_up(price * cost_rate);
        }
    }

    debug!(
        "special sales: {} stores at cost rate {}",
        columns.len(),
        cost_rate
    );
    result
}
