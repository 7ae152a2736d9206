use crate::dates::parse_date;
use crate::layout::parse_code_name;
use crate::schema::{cell_at, CategoryTimeSalesData, CategoryTimeSalesRecord, Rows, TimeSlotEntry};
use crate::utils::{safe_number, store_id_from_code};
use chrono::Datelike;
use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):").expect("Invalid regex"));
static STORE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}):").expect("Invalid regex"));

const DATA_START_ROW: usize = 3;
const TOTALS_COL: usize = 5;
const FIRST_SLOT_COL: usize = TOTALS_COL + 2;
const FALLBACK_FIRST_HOUR: u32 = 9;

fn header_hours(rows: &Rows) -> Vec<u32> {
    let mut seen = HashSet::new();
    rows[0]
        .iter()
        .skip(TOTALS_COL)
        .filter_map(|cell| {
            let text = cell.as_text();
            HOUR_RE
                .captures(text.trim())
                .and_then(|caps| caps[1].parse::<u32>().ok())
        })
        .filter(|hour| seen.insert(*hour))
        .collect()
}

fn parse_store_id(text: &str) -> String {
    match STORE_CODE_RE.captures(text) {
        Some(caps) => store_id_from_code(&caps[1]),
        None => text.to_string(),
    }
}

/// Category x hour sales.
///
/// Row 0 carries the hour labels (`"9:00"`), rows 1-2 are sub-headers and
/// data starts at row 3 with date, store, department, line and class labels,
/// the day's quantity/amount totals, then one quantity/amount pair per hour.
/// Empty pairs are omitted from `time_slots` but still advance the hour.
pub fn process_category_time_sales(
    rows: &Rows,
    target_month: Option<u32>,
) -> CategoryTimeSalesData {
    let mut data = CategoryTimeSalesData::default();
    if rows.len() < DATA_START_ROW + 1 {
        return data;
    }

    let hours = header_hours(rows);
    for row in rows.iter().skip(DATA_START_ROW) {
        if cell_at(row, 0).is_blank() && cell_at(row, 1).is_blank() {
            continue;
        }
        let Some(date) = parse_date(cell_at(row, 0), None) else {
            continue;
        };
        if target_month.is_some_and(|month| date.month() != month) {
            continue;
        }

        let mut time_slots = Vec::new();
        let mut col = FIRST_SLOT_COL;
        let mut pair_idx = 0usize;
        while col + 1 < row.len() {
            let quantity = safe_number(&row[col]);
            let amount = safe_number(&row[col + 1]);
            if quantity != 0.0 || amount != 0.0 {
                let hour = hours
                    .get(pair_idx)
                    .copied()
                    .unwrap_or(FALLBACK_FIRST_HOUR + pair_idx as u32);
                time_slots.push(TimeSlotEntry {
                    hour,
                    quantity,
                    amount,
                });
            }
            pair_idx += 1;
            col += 2;
        }

        data.records.push(CategoryTimeSalesRecord {
            day: date.day(),
            store_id: parse_store_id(&cell_at(row, 1).as_text()),
            department: parse_code_name(cell_at(row, 2)),
            line: parse_code_name(cell_at(row, 3)),
            klass: parse_code_name(cell_at(row, 4)),
            time_slots,
            total_quantity: safe_number(cell_at(row, TOTALS_COL)),
            total_amount: safe_number(cell_at(row, TOTALS_COL + 1)),
        });
    }

    debug!(
        "category time sales: {} records over {} hours",
        data.records.len(),
        hours.len()
    );
    data
}

/// Merges by day/store/department/line/class. A repeated key keeps its
/// original position and takes the incoming record.
pub fn merge_category_time_sales(
    existing: &CategoryTimeSalesData,
    incoming: &CategoryTimeSalesData,
) -> CategoryTimeSalesData {
    let mut records = existing.records.clone();
    let mut positions: BTreeMap<_, usize> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.merge_key(), idx))
        .collect();

    for record in &incoming.records {
        match positions.get(&record.merge_key()) {
            Some(&idx) => records[idx] = record.clone(),
            None => {
                positions.insert(record.merge_key(), records.len());
                records.push(record.clone());
            }
        }
    }
    CategoryTimeSalesData { records }
}
