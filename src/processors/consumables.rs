use crate::dates::day_of_month;
use crate::schema::{cell_at, ConsumableData, ConsumableItem, Rows};
use crate::utils::{basename, safe_number, store_id_from_code};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Only rows booked to this account are consumables.
pub const TARGET_ACCOUNT_CODE: &str = "81257";

static STORE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})").expect("Invalid regex"));

/// Consumable purchases for the store named by the filename prefix
/// (`"01消耗品.xlsx"` is store 1).
///
/// Columns: account code, item code, item name, quantity, cost, date.
/// Returns nothing when the filename carries no store prefix.
pub fn process_consumables(rows: &Rows, filename: &str) -> ConsumableData {
    let mut result = ConsumableData::new();
    if rows.len() < 2 {
        return result;
    }

    let Some(caps) = STORE_PREFIX_RE.captures(basename(filename)) else {
        debug!("consumables: no store prefix in {}", filename);
        return result;
    };
    let store_id = store_id_from_code(&caps[1]);

    for row in rows.iter().skip(1) {
        let account_code = cell_at(row, 0).as_text().trim().to_string();
        if account_code != TARGET_ACCOUNT_CODE {
            continue;
        }
        let Some(day) = day_of_month(cell_at(row, 5), None) else {
            continue;
        };

        let cost = safe_number(cell_at(row, 4));
        let entry = result.entry_or_default(&store_id, day);
        entry.cost += cost;
        entry.items.push(ConsumableItem {
            account_code,
            item_code: cell_at(row, 1).as_text(),
            item_name: cell_at(row, 2).as_text(),
            quantity: safe_number(cell_at(row, 3)),
            cost,
        });
    }

    result
}

/// Additive merge: costs for the same store/day are summed and item lists
/// concatenated in arrival order.
pub fn merge_consumable_data(
    existing: &ConsumableData,
    incoming: &ConsumableData,
) -> ConsumableData {
    let mut merged = existing.clone();
    for (store_id, day, record) in incoming.iter() {
        let entry = merged.entry_or_default(store_id, day);
        entry.cost += record.cost;
        entry.items.extend(record.items.iter().cloned());
    }
    merged
}
