use crate::dates::day_of_month;
use crate::layout::{field, parse_store_header, parse_supplier_header, ColumnLayout};
use crate::schema::{cell_at, PurchaseData, Rows, Store, Supplier, SupplierAmount};
use crate::utils::safe_number;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Row 0 carries `NNNNNNN:supplier` labels, row 1 the matching `NNNN:store`
/// labels, data starts at row 4 with cost/price pairs from column 3.
const SUPPLIER_LAYOUT: ColumnLayout = ColumnLayout {
    header_row: 0,
    first_group_col: 3,
    default_stride: 2,
    data_start_row: 4,
    min_rows: 5,
};

const STORE_LAYOUT: ColumnLayout = ColumnLayout {
    header_row: 1,
    ..SUPPLIER_LAYOUT
};

struct PurchaseColumn {
    col: usize,
    supplier: Supplier,
    store_id: String,
}

/// Per-store, per-day purchase totals with a supplier breakdown.
///
/// Only stores in `known_stores` are kept. Zero cost/price pairs are skipped.
pub fn process_purchase(rows: &Rows, known_stores: &BTreeSet<String>) -> PurchaseData {
    let mut result = PurchaseData::new();
    if !SUPPLIER_LAYOUT.has_enough_rows(rows) {
        return result;
    }

    let store_header = STORE_LAYOUT.header(rows);
    let supplier_header = SUPPLIER_LAYOUT.header(rows);
    let columns: Vec<PurchaseColumn> = SUPPLIER_LAYOUT
        .group_columns(rows, |cell| parse_supplier_header(cell).is_some())
        .into_iter()
        .filter_map(|col| {
            let supplier = parse_supplier_header(&supplier_header[col])?;
            let store = parse_store_header(cell_at(store_header, col))?;
            known_stores.contains(&store.id).then_some(PurchaseColumn {
                col,
                supplier,
                store_id: store.id,
            })
        })
        .collect();

    for row in SUPPLIER_LAYOUT.data_rows(rows) {
        let Some(day) = day_of_month(cell_at(row, 0), None) else {
            continue;
        };

        for column in &columns {
            let cost = safe_number(field(row, column.col, 0));
            let price = safe_number(field(row, column.col, 1));
            if cost == 0.0 && price == 0.0 {
                continue;
            }

            let entry = result.entry_or_default(&column.store_id, day);
            let amount = entry
                .suppliers
                .entry(column.supplier.code.clone())
                .or_insert_with(|| SupplierAmount {
                    name: column.supplier.name.clone(),
                    cost: 0.0,
                    price: 0.0,
                });
            amount.cost += cost;
            amount.price += price;
            entry.total.cost += cost;
            entry.total.price += price;
        }
    }

    debug!(
        "purchase: {} column groups across {} stores",
        columns.len(),
        result.store_count()
    );
    result
}

pub fn extract_stores_from_purchase(rows: &Rows) -> BTreeMap<String, Store> {
    super::extract_stores(rows, &STORE_LAYOUT)
}

pub fn extract_suppliers_from_purchase(rows: &Rows) -> BTreeMap<String, Supplier> {
    let header = SUPPLIER_LAYOUT.header(rows);
    let mut suppliers = BTreeMap::new();
    for col in SUPPLIER_LAYOUT.group_columns(rows, |cell| parse_supplier_header(cell).is_some()) {
        if let Some(supplier) = parse_supplier_header(&header[col]) {
            suppliers.entry(supplier.code.clone()).or_insert(supplier);
        }
    }
    suppliers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::fixtures::{data_row, text_row};

    fn purchase_rows() -> Rows {
        vec![
            text_row(&["", "", "", "0000001:青果市場", "", "0000002:日配", ""]),
            text_row(&["", "", "", "0001:本店", "", "0002:駅前店", ""]),
            text_row(&["", "", "", "原価金額", "売価金額", "原価金額", "売価金額"]),
            text_row(&["日付"]),
            data_row("2026-02-01", &[1000.0, 1300.0, 500.0, 700.0]),
            data_row("2026-02-02", &[0.0, 0.0, 200.0, 260.0]),
            data_row("合計", &[1000.0, 1300.0, 700.0, 960.0]),
        ]
    }

    fn stores(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_process_purchase_builds_supplier_breakdown() {
        let data = process_purchase(&purchase_rows(), &stores(&["1", "2"]));

        let day1 = data.get("1", 1).unwrap();
        assert_eq!(day1.total.cost, 1000.0);
        assert_eq!(day1.total.price, 1300.0);
        assert_eq!(day1.suppliers["0000001"].name, "青果市場");

        let day2 = data.get("2", 2).unwrap();
        assert_eq!(day2.total.cost, 200.0);
        assert_eq!(day2.suppliers["0000002"].price, 260.0);
    }

    #[test]
    fn test_zero_pairs_and_summary_rows_skipped() {
        let data = process_purchase(&purchase_rows(), &stores(&["1", "2"]));
        assert!(data.get("1", 2).is_none());
        assert_eq!(data.store("1").map(|days| days.len()), Some(1));
    }

    #[test]
    fn test_unknown_stores_filtered() {
        let data = process_purchase(&purchase_rows(), &stores(&["1"]));
        assert!(data.get("1", 1).is_some());
        assert!(data.store("2").is_none());
    }

    #[test]
    fn test_too_few_rows_yields_nothing() {
        let rows: Rows = purchase_rows().into_iter().take(4).collect();
        assert!(process_purchase(&rows, &stores(&["1", "2"])).is_empty());
    }

    #[test]
    fn test_extract_stores_and_suppliers() {
        let rows = purchase_rows();
        let found = extract_stores_from_purchase(&rows);
        assert_eq!(found.len(), 2);
        assert_eq!(found["2"].name, "駅前店");
        assert_eq!(found["2"].code, "0002");

        let suppliers = extract_suppliers_from_purchase(&rows);
        assert_eq!(suppliers.len(), 2);
        assert_eq!(suppliers["0000002"].name, "日配");
    }
}
