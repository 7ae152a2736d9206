//! Header-cell parsing and repeating column groups.
//!
//! Store and supplier columns in the exports are labelled `code:name` in one
//! or two header rows and repeat every `stride` columns. Each processor
//! declares a [`ColumnLayout`] and resolves it once per file into the list of
//! group start columns; all regex-based code/name splitting lives here.

use crate::schema::{cell_at, Cell, CodeName, Row, Rows, Store, Supplier};
use crate::utils::store_id_from_code;
use regex::Regex;
use std::sync::LazyLock;

static STORE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}):(.*)").expect("Invalid regex"));
static SUPPLIER_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{7})").expect("Invalid regex"));
static SUPPLIER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{7}:?").expect("Invalid regex"));
static CODE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(.*)$").expect("Invalid regex"));

/// `"0001:本店"` becomes store `{ id: "1", code: "0001", name: "本店" }`.
pub fn parse_store_header(cell: &Cell) -> Option<Store> {
    let text = cell.as_text();
    let caps = STORE_HEADER_RE.captures(&text)?;
    let code = caps[1].to_string();
    let name = non_empty_or(caps[2].trim(), &code);
    Some(Store {
        id: store_id_from_code(&code),
        code,
        name,
    })
}

/// `"0000001:青果市場"` becomes supplier `{ code: "0000001", name: "青果市場" }`.
pub fn parse_supplier_header(cell: &Cell) -> Option<Supplier> {
    let text = cell.as_text();
    let code = SUPPLIER_CODE_RE.captures(&text)?[1].to_string();
    let stripped = SUPPLIER_PREFIX_RE.replace(&text, "");
    let name = non_empty_or(stripped.trim(), &code);
    Some(Supplier { code, name })
}

/// Splits a `code:name` hierarchy label; unlabelled text is used as both.
pub fn parse_code_name(cell: &Cell) -> CodeName {
    let text = cell.as_text();
    match CODE_NAME_RE.captures(&text) {
        Some(caps) => CodeName {
            code: caps[1].to_string(),
            name: caps[2].trim().to_string(),
        },
        None => CodeName {
            code: text.clone(),
            name: text,
        },
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Distance between repeating groups.
///
/// Two or more header matches give the stride directly. A single match falls
/// back to `default_stride`, capped by the columns left in the row.
pub fn infer_stride(match_cols: &[usize], default_stride: usize, row_len: usize) -> usize {
    match match_cols {
        [first, second, ..] if second > first => second - first,
        [only] => default_stride.min(row_len.saturating_sub(*only)).max(1),
        _ => default_stride.max(1),
    }
}

/// Typed description of a repeating-group export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Row holding the `code:name` group labels.
    pub header_row: usize,
    pub first_group_col: usize,
    pub default_stride: usize,
    pub data_start_row: usize,
    /// Files with fewer rows yield no entries.
    pub min_rows: usize,
}

impl ColumnLayout {
    pub fn has_enough_rows(&self, rows: &Rows) -> bool {
        rows.len() >= self.min_rows
    }

    pub fn header<'a>(&self, rows: &'a Rows) -> &'a [Cell] {
        rows.get(self.header_row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start columns of every group whose header cell satisfies `is_group`.
    ///
    /// Groups are walked from the first match using the inferred stride, so
    /// repeated labels inside a group (merged cells exported per column) do
    /// not produce extra groups. A match that repeats the label of the column
    /// right before it is not counted when measuring the stride.
    pub fn group_columns(&self, rows: &Rows, is_group: impl Fn(&Cell) -> bool) -> Vec<usize> {
        let header = self.header(rows);
        let label = |col: usize| header[col].as_text().trim().to_string();
        let mut matches: Vec<usize> = Vec::new();
        let mut previous: Option<(usize, String)> = None;
        for col in (self.first_group_col..header.len()).filter(|col| is_group(&header[*col])) {
            let current = label(col);
            let repeated = previous.as_ref().is_some_and(|(prev_col, prev_label)| {
                *prev_col + 1 == col && *prev_label == current
            });
            if !repeated {
                matches.push(col);
            }
            previous = Some((col, current));
        }

        let Some(&start) = matches.first() else {
            return Vec::new();
        };

        let stride = infer_stride(&matches, self.default_stride, header.len());
        (start..header.len())
            .step_by(stride)
            .filter(|col| is_group(&header[*col]))
            .collect()
    }

    pub fn data_rows<'a>(&self, rows: &'a Rows) -> impl Iterator<Item = &'a Row> {
        rows.iter().skip(self.data_start_row)
    }
}

/// Cell at `col + offset` of a data row.
pub fn field(row: &[Cell], col: usize, offset: usize) -> &Cell {
    cell_at(row, col + offset)
}
