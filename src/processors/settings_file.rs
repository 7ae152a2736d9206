use crate::schema::{cell_at, InventoryConfig, Rows};
use crate::utils::{safe_number, store_id_from_text};
use std::collections::BTreeMap;

const DATA_START_ROW: usize = 1;
const COL_STORE: usize = 0;
const COL_OPENING: usize = 1;
const COL_CLOSING: usize = 2;
const COL_GP_BUDGET: usize = 3;

/// Inventory checkpoints per store: code, opening, closing, gross profit budget.
///
/// A zero inventory means "not counted" and is stored as `None`; the budget is
/// only kept when positive.
pub fn process_settings(rows: &Rows) -> BTreeMap<String, InventoryConfig> {
    let mut result = BTreeMap::new();
    if rows.len() < DATA_START_ROW + 1 {
        return result;
    }

    for row in rows.iter().skip(DATA_START_ROW) {
        let Some(store_id) = store_id_from_text(&cell_at(row, COL_STORE).as_text()) else {
            continue;
        };

        let opening = safe_number(cell_at(row, COL_OPENING));
        let closing = safe_number(cell_at(row, COL_CLOSING));
        let gp_budget = safe_number(cell_at(row, COL_GP_BUDGET));

        result.insert(
            store_id.clone(),
            InventoryConfig {
                store_id,
                opening_inventory: (opening != 0.0).then_some(opening),
                closing_inventory: (closing != 0.0).then_some(closing),
                gross_profit_budget: (gp_budget > 0.0).then_some(gp_budget),
            },
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cell;

    #[test]
    fn test_process_settings() {
        let rows = vec![
            vec![
                Cell::from("店舗コード"),
                Cell::from("期首在庫"),
                Cell::from("期末在庫"),
                Cell::from("粗利予算"),
            ],
            vec![
                Cell::from("0001"),
                Cell::from(1_000_000.0),
                Cell::from(800_000.0),
                Cell::from(1_500_000.0),
            ],
            vec![Cell::Number(2.0), Cell::from(0.0), Cell::from("900,000"), Cell::from(-5.0)],
            vec![Cell::Empty, Cell::from(1.0)],
        ];
        let settings = process_settings(&rows);
        assert_eq!(settings.len(), 2);

        let first = &settings["1"];
        assert_eq!(first.opening_inventory, Some(1_000_000.0));
        assert_eq!(first.closing_inventory, Some(800_000.0));
        assert_eq!(first.gross_profit_budget, Some(1_500_000.0));

        let second = &settings["2"];
        assert_eq!(second.opening_inventory, None);
        assert_eq!(second.closing_inventory, Some(900_000.0));
        assert_eq!(second.gross_profit_budget, None);
    }
}
