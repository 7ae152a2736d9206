use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// A single spreadsheet cell as handed over by the external tabular reader.
///
/// Deserializes untagged: `null` becomes `Empty`, JSON numbers become `Number`
/// and strings become `Text`. `Date` is only produced by readers that already
/// decoded a native date cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Text form of the cell, matching how the exports print numbers
    /// (integers without a trailing `.0`).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

pub type Row = Vec<Cell>;
pub type Rows = Vec<Row>;

/// Returns the cell at `col`, or an empty cell when the row is shorter.
pub fn cell_at(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostPricePair {
    pub cost: f64,
    pub price: f64,
}

impl CostPricePair {
    pub const ZERO: CostPricePair = CostPricePair {
        cost: 0.0,
        price: 0.0,
    };

    pub fn new(cost: f64, price: f64) -> Self {
        Self { cost, price }
    }
}

impl Add for CostPricePair {
    type Output = CostPricePair;

    fn add(self, rhs: Self) -> Self::Output {
        CostPricePair {
            cost: self.cost + rhs.cost,
            price: self.price + rhs.price,
        }
    }
}

impl AddAssign for CostPricePair {
    fn add_assign(&mut self, rhs: Self) {
        self.cost += rhs.cost;
        self.price += rhs.price;
    }
}

/// Closed set of source kinds the import layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Purchase,
    Sales,
    Discount,
    SalesDiscount,
    PrevYearSalesDiscount,
    InitialSettings,
    Budget,
    Consumables,
    InterStoreIn,
    InterStoreOut,
    Flowers,
    DirectProduce,
    CategoryTimeSales,
}

impl DataType {
    pub const ALL: [DataType; 13] = [
        DataType::Purchase,
        DataType::Sales,
        DataType::Discount,
        DataType::SalesDiscount,
        DataType::PrevYearSalesDiscount,
        DataType::InitialSettings,
        DataType::Budget,
        DataType::Consumables,
        DataType::InterStoreIn,
        DataType::InterStoreOut,
        DataType::Flowers,
        DataType::DirectProduce,
        DataType::CategoryTimeSales,
    ];

    /// Wire tag, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Purchase => "purchase",
            DataType::Sales => "sales",
            DataType::Discount => "discount",
            DataType::SalesDiscount => "salesDiscount",
            DataType::PrevYearSalesDiscount => "prevYearSalesDiscount",
            DataType::InitialSettings => "initialSettings",
            DataType::Budget => "budget",
            DataType::Consumables => "consumables",
            DataType::InterStoreIn => "interStoreIn",
            DataType::InterStoreOut => "interStoreOut",
            DataType::Flowers => "flowers",
            DataType::DirectProduce => "directProduce",
            DataType::CategoryTimeSales => "categoryTimeSales",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierAmount {
    pub name: String,
    pub cost: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PurchaseDayEntry {
    pub suppliers: BTreeMap<String, SupplierAmount>,
    pub total: CostPricePair,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SalesDayEntry {
    pub sales: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscountDayEntry {
    pub sales: f64,
    /// Absolute markdown amount.
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub day: u32,
    pub cost: f64,
    pub price: f64,
    pub from_store_id: String,
    pub to_store_id: String,
    pub is_department_transfer: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferDayEntry {
    pub inter_store_in: Vec<TransferRecord>,
    pub inter_store_out: Vec<TransferRecord>,
    pub inter_department_in: Vec<TransferRecord>,
    pub inter_department_out: Vec<TransferRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecialSalesDayEntry {
    pub price: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumableItem {
    pub account_code: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsumableDailyRecord {
    pub cost: f64,
    pub items: Vec<ConsumableItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeName {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotEntry {
    pub hour: u32,
    pub quantity: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTimeSalesRecord {
    pub day: u32,
    pub store_id: String,
    pub department: CodeName,
    pub line: CodeName,
    pub klass: CodeName,
    pub time_slots: Vec<TimeSlotEntry>,
    pub total_quantity: f64,
    pub total_amount: f64,
}

impl CategoryTimeSalesRecord {
    /// Identity used when merging files: later records with the same key win.
    pub fn merge_key(&self) -> (u32, String, String, String, String) {
        (
            self.day,
            self.store_id.clone(),
            self.department.code.clone(),
            self.line.code.clone(),
            self.klass.code.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTimeSalesData {
    pub records: Vec<CategoryTimeSalesRecord>,
}

/// Per-store inventory checkpoints and gross profit budget from the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub store_id: String,
    pub opening_inventory: Option<f64>,
    pub closing_inventory: Option<f64>,
    pub gross_profit_budget: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetData {
    pub store_id: String,
    pub daily: BTreeMap<u32, f64>,
    pub total: f64,
}

/// Values keyed by store id, then by day of month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreDayMap<T> {
    entries: BTreeMap<String, BTreeMap<u32, T>>,
}

impl<T> Default for StoreDayMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> StoreDayMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, store_id: &str, day: u32) -> Option<&T> {
        self.entries.get(store_id).and_then(|days| days.get(&day))
    }

    pub fn insert(&mut self, store_id: &str, day: u32, value: T) -> Option<T> {
        self.entries
            .entry(store_id.to_string())
            .or_default()
            .insert(day, value)
    }

    pub fn store(&self, store_id: &str) -> Option<&BTreeMap<u32, T>> {
        self.entries.get(store_id)
    }

    pub fn store_ids(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, u32, &T)> {
        self.entries
            .iter()
            .flat_map(|(store, days)| days.iter().map(move |(day, v)| (store, *day, v)))
    }

    /// Number of stores with at least one entry.
    pub fn store_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> StoreDayMap<T> {
    /// Copies every entry of `other` over this map; overlapping store/day
    /// entries take the incoming value.
    pub fn overlay(&mut self, other: &StoreDayMap<T>) {
        for (store_id, days) in &other.entries {
            let target = self.entries.entry(store_id.clone()).or_default();
            for (day, value) in days {
                target.insert(*day, value.clone());
            }
        }
    }
}

impl<T: Default> StoreDayMap<T> {
    pub fn entry_or_default(&mut self, store_id: &str, day: u32) -> &mut T {
        self.entries
            .entry(store_id.to_string())
            .or_default()
            .entry(day)
            .or_default()
    }
}

pub type PurchaseData = StoreDayMap<PurchaseDayEntry>;
pub type SalesData = StoreDayMap<SalesDayEntry>;
pub type DiscountData = StoreDayMap<DiscountDayEntry>;
pub type TransferData = StoreDayMap<TransferDayEntry>;
pub type SpecialSalesData = StoreDayMap<SpecialSalesDayEntry>;
pub type ConsumableData = StoreDayMap<ConsumableDailyRecord>;

/// Running aggregate of every normalized source for one month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportedData {
    pub stores: BTreeMap<String, Store>,
    pub suppliers: BTreeMap<String, Supplier>,
    pub purchase: PurchaseData,
    pub sales: SalesData,
    pub discount: DiscountData,
    pub prev_year_sales: SalesData,
    pub prev_year_discount: DiscountData,
    pub inter_store_in: TransferData,
    pub inter_store_out: TransferData,
    pub flowers: SpecialSalesData,
    pub direct_produce: SpecialSalesData,
    pub consumables: ConsumableData,
    pub category_time_sales: CategoryTimeSalesData,
    pub settings: BTreeMap<String, InventoryConfig>,
    pub budget: BTreeMap<String, BudgetData>,
}

impl ImportedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the display name of `store_id` replaced.
    /// Unknown ids leave the data unchanged.
    pub fn rename_store(&self, store_id: &str, name: &str) -> ImportedData {
        let mut next = self.clone();
        if let Some(store) = next.stores.get_mut(store_id) {
            store.name = name.to_string();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub level: ValidationLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ValidationMessage {
    pub fn new(level: ValidationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            details: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::from(500000.0).as_text(), "500000");
        assert_eq!(Cell::from(1.5).as_text(), "1.5");
        assert_eq!(Cell::Empty.as_text(), "");
        assert!(Cell::from("  ").is_blank());
        assert!(!Cell::from(0.0).is_blank());
    }

    #[test]
    fn test_cells_deserialize_untagged() {
        let row: Row = serde_json::from_str(r#"[null, 12.5, "0001:店舗A"]"#).unwrap();
        assert_eq!(row[0], Cell::Empty);
        assert_eq!(row[1], Cell::Number(12.5));
        assert_eq!(row[2], Cell::Text("0001:店舗A".to_string()));
    }

    #[test]
    fn test_data_type_tags_match_serde() {
        for data_type in DataType::ALL {
            let json = serde_json::to_string(&data_type).unwrap();
            assert_eq!(json, format!("\"{}\"", data_type.as_str()));
        }
    }

    #[test]
    fn test_cost_price_pair_addition() {
        let a = CostPricePair::new(100.0, 130.0);
        let b = CostPricePair::new(-50.0, -30.0);
        let sum = a + b;
        assert_eq!(sum, CostPricePair::new(50.0, 100.0));
        assert_eq!(a + CostPricePair::ZERO, a);
    }

    #[test]
    fn test_store_day_map_access() {
        let mut map: SalesData = StoreDayMap::new();
        map.insert("1", 3, SalesDayEntry { sales: 10.0 });
        map.entry_or_default("1", 4).sales += 5.0;
        map.entry_or_default("2", 1).sales += 7.0;

        assert_eq!(map.get("1", 3).map(|e| e.sales), Some(10.0));
        assert_eq!(map.get("1", 4).map(|e| e.sales), Some(5.0));
        assert_eq!(map.store_count(), 2);
        assert_eq!(map.iter().count(), 3);
        assert!(map.get("3", 1).is_none());
    }

    #[test]
    fn test_rename_store_returns_new_aggregate() {
        let mut data = ImportedData::new();
        data.stores.insert(
            "1".to_string(),
            Store {
                id: "1".to_string(),
                code: "0001".to_string(),
                name: "Old".to_string(),
            },
        );
        let renamed = data.rename_store("1", "New");
        assert_eq!(renamed.stores["1"].name, "New");
        assert_eq!(data.stores["1"].name, "Old");
        assert_eq!(data.rename_store("9", "X"), data);
    }

    #[test]
    fn test_imported_data_json_roundtrip_with_day_keys() {
        let mut data = ImportedData::new();
        data.sales.insert("1", 15, SalesDayEntry { sales: 1200.0 });
        let json = serde_json::to_string(&data).unwrap();
        let back: ImportedData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sales.get("1", 15).map(|e| e.sales), Some(1200.0));
    }
}
