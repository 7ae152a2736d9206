use crate::dates::day_of_month;
use crate::schema::{cell_at, Row, Rows, TransferData, TransferRecord};
use crate::utils::{safe_number, store_id_from_text};
use log::debug;

struct Endpoints {
    from_code: String,
    to_code: String,
    from_id: String,
    to_id: String,
}

impl Endpoints {
    fn new(row: &Row, from_col: usize, to_col: usize) -> Self {
        let from_code = cell_at(row, from_col).as_text().trim().to_string();
        let to_code = cell_at(row, to_col).as_text().trim().to_string();
        Self {
            from_id: store_id_from_text(&from_code).unwrap_or_else(|| "0".to_string()),
            to_id: store_id_from_text(&to_code).unwrap_or_else(|| "0".to_string()),
            from_code,
            to_code,
        }
    }

    /// Moves within one store are department transfers.
    fn is_department_transfer(&self) -> bool {
        self.from_code == self.to_code || self.from_id == self.to_id
    }
}

/// Inbound transfers: receiving store, date, sending store, cost, price.
/// Amounts are stored positive and filed under the receiving store.
pub fn process_inter_store_in(rows: &Rows) -> TransferData {
    let mut result = TransferData::new();
    if rows.len() < 2 {
        return result;
    }

    for row in rows.iter().skip(1) {
        let endpoints = Endpoints::new(row, 2, 0);
        let Some(day) = day_of_month(cell_at(row, 1), None) else {
            continue;
        };
        let record = TransferRecord {
            day,
            cost: safe_number(cell_at(row, 3)).abs(),
            price: safe_number(cell_at(row, 4)).abs(),
            from_store_id: endpoints.from_id.clone(),
            to_store_id: endpoints.to_id.clone(),
            is_department_transfer: endpoints.is_department_transfer(),
        };

        let entry = result.entry_or_default(&endpoints.to_id, day);
        if record.is_department_transfer {
            entry.inter_department_in.push(record);
        } else {
            entry.inter_store_in.push(record);
        }
    }

    debug!("inter-store in: {} stores", result.store_count());
    result
}

/// Outbound transfers: date, sending store, receiving store, department
/// (unused), cost, price. Amounts are stored as negative absolute values and
/// filed under the sending store.
pub fn process_inter_store_out(rows: &Rows) -> TransferData {
    let mut result = TransferData::new();
    if rows.len() < 2 {
        return result;
    }

    for row in rows.iter().skip(1) {
        let endpoints = Endpoints::new(row, 1, 2);
        let Some(day) = day_of_month(cell_at(row, 0), None) else {
            continue;
        };
        let record = TransferRecord {
            day,
            cost: -safe_number(cell_at(row, 4)).abs(),
            price: -safe_number(cell_at(row, 5)).abs(),
            from_store_id: endpoints.from_id.clone(),
            to_store_id: endpoints.to_id.clone(),
            is_department_transfer: endpoints.is_department_transfer(),
        };

        let entry = result.entry_or_default(&endpoints.from_id, day);
        if record.is_department_transfer {
            entry.inter_department_out.push(record);
        } else {
            entry.inter_store_out.push(record);
        }
    }

    debug!("inter-store out: {} stores", result.store_count());
    result
}
