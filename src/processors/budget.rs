use crate::dates::day_of_month;
use crate::schema::{cell_at, BudgetData, Rows};
use crate::utils::{safe_number, store_id_from_text};
use std::collections::BTreeMap;

/// Daily sales budget rows: store code, date, amount. Non-positive amounts are skipped.
pub fn process_budget(rows: &Rows) -> BTreeMap<String, BudgetData> {
    let mut result: BTreeMap<String, BudgetData> = BTreeMap::new();
    if rows.len() < 2 {
        return result;
    }

    for row in rows.iter().skip(1) {
        let Some(store_id) = store_id_from_text(&cell_at(row, 0).as_text()) else {
            continue;
        };
        let Some(day) = day_of_month(cell_at(row, 1), None) else {
            continue;
        };
        let amount = safe_number(cell_at(row, 2));
        if amount <= 0.0 {
            continue;
        }

        result
            .entry(store_id.clone())
            .or_insert_with(|| BudgetData {
                store_id,
                ..BudgetData::default()
            })
            .daily
            .insert(day, amount);
    }

    for budget in result.values_mut() {
        budget.total = budget.daily.values().sum();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cell;

    #[test]
    fn test_process_budget() {
        let rows = vec![
            vec![Cell::from("店舗"), Cell::from("日付"), Cell::from("売上予算")],
            vec![Cell::from("0001"), Cell::from("2026-02-01"), Cell::from(200_000.0)],
            vec![Cell::from("0001"), Cell::from("2026-02-02"), Cell::from(250_000.0)],
            vec![Cell::from("0001"), Cell::from("2026-02-03"), Cell::from(0.0)],
            vec![Cell::from("0002"), Cell::from("bad date"), Cell::from(1.0)],
        ];
        let budget = process_budget(&rows);
        assert_eq!(budget.len(), 1);
        let store = &budget["1"];
        assert_eq!(store.daily.len(), 2);
        assert_eq!(store.total, 450_000.0);
        assert_eq!(store.store_id, "1");
    }
}
