use crate::schema::{DataType, Rows};
use crate::utils::basename;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

struct FileTypeRule {
    data_type: DataType,
    name: &'static str,
    filename_patterns: &'static [&'static str],
    header_patterns: &'static [&'static str],
}

/// Checked top to bottom. Flowers and direct produce share header text, so
/// they rely on filenames and come first; composite and budget files must be
/// tested before the plain sales/discount rules that their names also satisfy.
const FILE_TYPE_RULES: &[FileTypeRule] = &[
    FileTypeRule {
        data_type: DataType::Flowers,
        name: "花",
        filename_patterns: &["花", "hana"],
        header_patterns: &["販売金額"],
    },
    FileTypeRule {
        data_type: DataType::DirectProduce,
        name: "産直",
        filename_patterns: &["産直", "sanchoku"],
        header_patterns: &["販売金額"],
    },
    FileTypeRule {
        data_type: DataType::Purchase,
        name: "仕入",
        filename_patterns: &["仕入", "shiire"],
        header_patterns: &["取引先コード", "原価金額", "売価金額"],
    },
    FileTypeRule {
        data_type: DataType::Budget,
        name: "予算",
        filename_patterns: &["売上予算", "予算", "budget"],
        header_patterns: &["売上予算", "予算"],
    },
    FileTypeRule {
        data_type: DataType::PrevYearSalesDiscount,
        name: "前年売上売変",
        filename_patterns: &["前年売上売変", "前年売上", "prev_uriage"],
        header_patterns: &[],
    },
    FileTypeRule {
        data_type: DataType::SalesDiscount,
        name: "売上売変",
        filename_patterns: &["売上売変客数", "売上売変", "uriage_baihen", "uriageBaihen"],
        header_patterns: &[],
    },
    FileTypeRule {
        data_type: DataType::CategoryTimeSales,
        name: "分類別時間帯売上",
        filename_patterns: &["分類別時間帯売上", "時間帯売上"],
        header_patterns: &["取引時間", "【ライン】", "【クラス】"],
    },
    FileTypeRule {
        data_type: DataType::Sales,
        name: "売上",
        filename_patterns: &["売上", "uriage"],
        header_patterns: &["販売金額", "売上"],
    },
    FileTypeRule {
        data_type: DataType::Discount,
        name: "売変",
        filename_patterns: &["売変", "baihen"],
        header_patterns: &["売変合計", "値引"],
    },
    FileTypeRule {
        data_type: DataType::InitialSettings,
        name: "初期設定",
        filename_patterns: &["初期", "設定", "setting"],
        header_patterns: &["期首", "期末"],
    },
    FileTypeRule {
        data_type: DataType::InterStoreIn,
        name: "店間入",
        filename_patterns: &["店間入", "入庫"],
        header_patterns: &["店コードIN", "店舗コードIN"],
    },
    FileTypeRule {
        data_type: DataType::InterStoreOut,
        name: "店間出",
        filename_patterns: &["店間出", "出庫"],
        header_patterns: &["店コードOUT", "店舗コードOUT"],
    },
    FileTypeRule {
        data_type: DataType::Consumables,
        name: "消耗品",
        filename_patterns: &["消耗", "consumable"],
        header_patterns: &[],
    },
];

/// Numbered-export naming convention, consulted only when no keyword matched.
const PREFIX_RULES: &[(&str, DataType)] = &[
    ("0_", DataType::Budget),
    ("1_", DataType::SalesDiscount),
    ("2_", DataType::Purchase),
    ("3_", DataType::Flowers),
    ("4_", DataType::DirectProduce),
    ("5_", DataType::InterStoreIn),
    ("6_", DataType::InterStoreOut),
    ("7_", DataType::InitialSettings),
    ("8_", DataType::Consumables),
    ("998_", DataType::PrevYearSalesDiscount),
];

const HEADER_SCAN_ROWS: usize = 3;

static CATEGORY_TIME_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^8\.(分類別|.*時間帯)").expect("Invalid regex"));
static CONSUMABLE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}消耗").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionConfidence {
    Filename,
    Header,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    pub data_type: Option<DataType>,
    pub confidence: DetectionConfidence,
    pub rule_name: Option<&'static str>,
}

/// Classifies a file, trusting the filename over header text.
pub fn detect_file_type(filename: &str, rows: &Rows) -> DetectionResult {
    if let Some(data_type) = match_by_filename(filename) {
        return DetectionResult {
            data_type: Some(data_type),
            confidence: DetectionConfidence::Filename,
            rule_name: rule_name(data_type),
        };
    }

    if let Some(data_type) = match_by_header(rows) {
        return DetectionResult {
            data_type: Some(data_type),
            confidence: DetectionConfidence::Header,
            rule_name: rule_name(data_type),
        };
    }

    DetectionResult {
        data_type: None,
        confidence: DetectionConfidence::None,
        rule_name: None,
    }
}

/// Display name of a data type, falling back to its tag.
pub fn data_type_name(data_type: DataType) -> &'static str {
    rule_name(data_type).unwrap_or_else(|| data_type.as_str())
}

fn rule_name(data_type: DataType) -> Option<&'static str> {
    FILE_TYPE_RULES
        .iter()
        .find(|rule| rule.data_type == data_type)
        .map(|rule| rule.name)
}

fn match_by_filename(filename: &str) -> Option<DataType> {
    let base = basename(filename);

    if CATEGORY_TIME_PREFIX_RE.is_match(base) {
        return Some(DataType::CategoryTimeSales);
    }
    if CONSUMABLE_PREFIX_RE.is_match(base) {
        return Some(DataType::Consumables);
    }

    let lower = filename.to_lowercase();
    for rule in FILE_TYPE_RULES {
        if rule
            .filename_patterns
            .iter()
            .any(|pattern| lower.contains(&pattern.to_lowercase()))
        {
            return Some(rule.data_type);
        }
    }

    PREFIX_RULES
        .iter()
        .find(|(prefix, _)| base.starts_with(*prefix))
        .map(|(_, data_type)| *data_type)
}

fn match_by_header(rows: &Rows) -> Option<DataType> {
    if rows.is_empty() {
        return None;
    }

    let header_text = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .flatten()
        .map(|cell| cell.as_text())
        .collect::<Vec<_>>()
        .join(" ");

    FILE_TYPE_RULES
        .iter()
        .filter(|rule| !rule.header_patterns.is_empty())
        .find(|rule| {
            rule.header_patterns
                .iter()
                .any(|pattern| header_text.contains(pattern))
        })
        .map(|rule| rule.data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cell;

    fn header(cells: &[&str]) -> Rows {
        vec![cells.iter().map(|c| Cell::from(*c)).collect()]
    }

    #[test]
    fn test_keyword_filenames() {
        let empty = Rows::new();
        let cases = [
            ("仕入データ.xlsx", DataType::Purchase),
            ("shiire_202602.csv", DataType::Purchase),
            ("売上予算.xlsx", DataType::Budget),
            ("前年売上売変.xlsx", DataType::PrevYearSalesDiscount),
            ("売上売変客数.xlsx", DataType::SalesDiscount),
            ("売上.xlsx", DataType::Sales),
            ("売変.xlsx", DataType::Discount),
            ("初期設定.xlsx", DataType::InitialSettings),
            ("店間入.xlsx", DataType::InterStoreIn),
            ("店間出.xlsx", DataType::InterStoreOut),
            ("花.xlsx", DataType::Flowers),
            ("産直.xlsx", DataType::DirectProduce),
            ("Consumable_list.csv", DataType::Consumables),
        ];
        for (name, expected) in cases {
            let result = detect_file_type(name, &empty);
            assert_eq!(result.data_type, Some(expected), "{}", name);
            assert_eq!(result.confidence, DetectionConfidence::Filename);
        }
    }

    #[test]
    fn test_composite_types_win_over_narrow_ones() {
        let empty = Rows::new();
        // "売上売変" also contains both "売上" and "売変"
        assert_eq!(
            detect_file_type("1_売上売変.xlsx", &empty).data_type,
            Some(DataType::SalesDiscount)
        );
        assert_eq!(
            detect_file_type("前年売上売変_2025.xlsx", &empty).data_type,
            Some(DataType::PrevYearSalesDiscount)
        );
    }

    #[test]
    fn test_basename_prefix_patterns() {
        let empty = Rows::new();
        assert_eq!(
            detect_file_type("8.分類別時間帯売上260201.csv", &empty).data_type,
            Some(DataType::CategoryTimeSales)
        );
        assert_eq!(
            detect_file_type("exports/01消耗品_260130.xls", &empty).data_type,
            Some(DataType::Consumables)
        );
    }

    #[test]
    fn test_numbered_prefix_fallback() {
        let empty = Rows::new();
        assert_eq!(detect_file_type("0_a.xlsx", &empty).data_type, Some(DataType::Budget));
        assert_eq!(
            detect_file_type("5_data.xlsx", &empty).data_type,
            Some(DataType::InterStoreIn)
        );
        assert_eq!(
            detect_file_type("998_data.xlsx", &empty).data_type,
            Some(DataType::PrevYearSalesDiscount)
        );
    }

    #[test]
    fn test_header_fallback() {
        let rows = header(&["", "", "", "取引先コード", "原価金額"]);
        let result = detect_file_type("export.xlsx", &rows);
        assert_eq!(result.data_type, Some(DataType::Purchase));
        assert_eq!(result.confidence, DetectionConfidence::Header);
        assert_eq!(result.rule_name, Some("仕入"));

        // flowers and direct produce share this header, so the first rule wins
        let rows = header(&["販売金額"]);
        assert_eq!(
            detect_file_type("export.xlsx", &rows).data_type,
            Some(DataType::Flowers)
        );
    }

    #[test]
    fn test_header_scan_limited_to_three_rows() {
        let mut rows = vec![vec![Cell::from("x")]; 3];
        rows.push(vec![Cell::from("期首")]);
        assert_eq!(detect_file_type("export.xlsx", &rows).data_type, None);
    }

    #[test]
    fn test_no_match() {
        let result = detect_file_type("mystery.xlsx", &header(&["foo"]));
        assert_eq!(result.data_type, None);
        assert_eq!(result.confidence, DetectionConfidence::None);
        assert_eq!(result.rule_name, None);
    }

    #[test]
    fn test_data_type_name() {
        assert_eq!(data_type_name(DataType::SalesDiscount), "売上売変");
        assert_eq!(data_type_name(DataType::CategoryTimeSales), "分類別時間帯売上");
    }
}
