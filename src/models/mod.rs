//! Row schema shared by every shop: canonical columns, side-channel columns
//! and the table that pages and shops produce.

pub mod item;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::currency::parse_number;

pub use item::{CompositeItem, Item, SingleItem, try_extract_or_default};

/// Canonical fields every extracted row carries, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Group,
    Title,
    Stock,
    ConvertedPrice,
    ConvertedOldPrice,
    Discount,
    OrigPrice,
    OrigOldPrice,
    Currency,
    ConversionRate,
    Url,
    ImageUrl,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Group,
        Field::Title,
        Field::Stock,
        Field::ConvertedPrice,
        Field::ConvertedOldPrice,
        Field::Discount,
        Field::OrigPrice,
        Field::OrigOldPrice,
        Field::Currency,
        Field::ConversionRate,
        Field::Url,
        Field::ImageUrl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Group => "group",
            Field::Title => "title",
            Field::Stock => "stock",
            Field::ConvertedPrice => "converted_price",
            Field::ConvertedOldPrice => "converted_old_price",
            Field::Discount => "discount",
            Field::OrigPrice => "orig_price",
            Field::OrigOldPrice => "orig_old_price",
            Field::Currency => "currency",
            Field::ConversionRate => "conversion_rate",
            Field::Url => "url",
            Field::ImageUrl => "image_url",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::ConvertedPrice
                | Field::ConvertedOldPrice
                | Field::Discount
                | Field::OrigPrice
                | Field::OrigOldPrice
                | Field::ConversionRate
        )
    }

    /// Schema default: NaN for numeric columns, empty otherwise.
    pub fn default_cell(self) -> Cell {
        if self.is_numeric() {
            Cell::Number(f64::NAN)
        } else {
            Cell::Empty
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every output column: the canonical fields followed by the side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Field(Field),
    Raw,
    Error,
    Others,
}

impl Column {
    pub const RAW: &'static str = "_raw";
    pub const ERROR: &'static str = "_error";
    pub const OTHERS: &'static str = "_others";

    pub fn all() -> Vec<Column> {
        let mut columns: Vec<Column> = Field::ALL.into_iter().map(Column::Field).collect();
        columns.extend([Column::Raw, Column::Error, Column::Others]);
        columns
    }

    /// Columns sent to the spreadsheet: internal raw/error diagnostics are dropped.
    pub fn published() -> Vec<Column> {
        Column::all()
            .into_iter()
            .filter(|c| !matches!(c, Column::Raw | Column::Error))
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Field(field) => field.name(),
            Column::Raw => Self::RAW,
            Column::Error => Self::ERROR,
            Column::Others => Self::OTHERS,
        }
    }
}

/// A single loosely typed value as produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.is_nan() => None,
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Numeric view of the cell; text goes through the lenient price parser.
    pub fn to_number(&self) -> f64 {
        match self {
            Cell::Empty => f64::NAN,
            Cell::Text(s) => parse_number(s),
            Cell::Number(n) => *n,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        }
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

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, Into::into)
    }
}

/// One output row. Unknown fields are never dropped, they live in `others`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub group: Option<String>,
    pub title: Option<String>,
    pub stock: Option<String>,
    pub converted_price: f64,
    pub converted_old_price: f64,
    pub discount: f64,
    pub orig_price: f64,
    pub orig_old_price: f64,
    pub currency: Option<String>,
    pub conversion_rate: f64,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub raw: Option<String>,
    pub error: Option<String>,
    pub others: BTreeMap<String, Value>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            group: None,
            title: None,
            stock: None,
            converted_price: f64::NAN,
            converted_old_price: f64::NAN,
            discount: f64::NAN,
            orig_price: f64::NAN,
            orig_old_price: f64::NAN,
            currency: None,
            conversion_rate: f64::NAN,
            url: None,
            image_url: None,
            raw: None,
            error: None,
            others: BTreeMap::new(),
        }
    }
}

impl Record {
    /// A row that only carries a failure and whatever payload caused it.
    pub fn error_row(error: impl fmt::Display, raw: Option<String>) -> Self {
        Self {
            error: Some(error.to_string()),
            raw,
            ..Self::default()
        }
    }

    pub fn get(&self, field: Field) -> Cell {
        let text = |v: &Option<String>| v.clone().map_or(Cell::Empty, Cell::Text);
        match field {
            Field::Group => text(&self.group),
            Field::Title => text(&self.title),
            Field::Stock => text(&self.stock),
            Field::ConvertedPrice => Cell::Number(self.converted_price),
            Field::ConvertedOldPrice => Cell::Number(self.converted_old_price),
            Field::Discount => Cell::Number(self.discount),
            Field::OrigPrice => Cell::Number(self.orig_price),
            Field::OrigOldPrice => Cell::Number(self.orig_old_price),
            Field::Currency => text(&self.currency),
            Field::ConversionRate => Cell::Number(self.conversion_rate),
            Field::Url => text(&self.url),
            Field::ImageUrl => text(&self.image_url),
        }
    }

    pub fn set(&mut self, field: Field, cell: Cell) {
        match field {
            Field::Group => self.group = cell.to_text(),
            Field::Title => self.title = cell.to_text(),
            Field::Stock => self.stock = cell.to_text(),
            Field::ConvertedPrice => self.converted_price = cell.to_number(),
            Field::ConvertedOldPrice => self.converted_old_price = cell.to_number(),
            Field::Discount => self.discount = cell.to_number(),
            Field::OrigPrice => self.orig_price = cell.to_number(),
            Field::OrigOldPrice => self.orig_old_price = cell.to_number(),
            Field::Currency => self.currency = cell.to_text(),
            Field::ConversionRate => self.conversion_rate = cell.to_number(),
            Field::Url => self.url = cell.to_text(),
            Field::ImageUrl => self.image_url = cell.to_text(),
        }
    }

    /// Value of any output column, `others` rendered as JSON text.
    pub fn value(&self, column: Column) -> Cell {
        match column {
            Column::Field(field) => self.get(field),
            Column::Raw => self.raw.clone().into(),
            Column::Error => self.error.clone().into(),
            Column::Others => {
                let others = Value::Object(self.others.clone().into_iter().collect());
                Cell::Text(others.to_string())
            }
        }
    }

    pub fn compute_discount(&mut self) {
        self.discount = discount(self.orig_price, self.orig_old_price);
    }
}

/// `(1 - price / old_price) * 100`, NaN when either side is missing or the
/// old price is zero.
pub fn discount(price: f64, old_price: f64) -> f64 {
    if price.is_nan() || old_price.is_nan() || old_price == 0.0 {
        return f64::NAN;
    }
    price / old_price * -100.0 + 100.0
}

/// Ordered collection of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn single(row: Record) -> Self {
        Self { rows: vec![row] }
    }

    pub fn columns() -> Vec<&'static str> {
        Column::all().into_iter().map(Column::name).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn append(&mut self, other: Table) {
        self.rows.extend(other.rows);
    }

    /// Discount descending, then title ascending. Missing values sort last
    /// and equal keys keep their original order.
    pub fn sort_by_discount(&mut self) {
        self.rows.sort_by(|a, b| {
            descending_nan_last(a.discount, b.discount)
                .then_with(|| ascending_none_last(a.title.as_deref(), b.title.as_deref()))
        });
    }

    /// String grid for the given columns; NaN and missing values become "".
    pub fn to_strings(&self, columns: &[Column]) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.value(*c).to_text().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A table with the full column set and zero rows.
pub fn empty_table() -> Table {
    Table::default()
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn ascending_none_last(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, discount: f64) -> Record {
        Record {
            title: Some(title.to_string()),
            discount,
            ..Record::default()
        }
    }

    #[test]
    fn empty_table_has_canonical_and_side_channel_columns() {
        let table = empty_table();
        assert!(table.is_empty());
        assert_eq!(
            Table::columns(),
            vec![
                "group",
                "title",
                "stock",
                "converted_price",
                "converted_old_price",
                "discount",
                "orig_price",
                "orig_old_price",
                "currency",
                "conversion_rate",
                "url",
                "image_url",
                "_raw",
                "_error",
                "_others",
            ]
        );
    }

    #[test]
    fn published_columns_drop_raw_and_error() {
        let names: Vec<_> = Column::published().into_iter().map(Column::name).collect();
        assert!(!names.contains(&"_raw"));
        assert!(!names.contains(&"_error"));
        assert_eq!(names.last(), Some(&"_others"));
    }

    #[test]
    fn discount_from_original_prices() {
        assert!((discount(80.0, 100.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn discount_is_nan_for_zero_or_missing_old_price() {
        assert!(discount(80.0, 0.0).is_nan());
        assert!(discount(80.0, f64::NAN).is_nan());
        assert!(discount(f64::NAN, 100.0).is_nan());
    }

    #[test]
    fn numeric_fields_parse_text_leniently() {
        let mut record = Record::default();
        record.set(Field::OrigPrice, Cell::from("£12.99"));
        record.set(Field::OrigOldPrice, Cell::from("n/a"));
        assert!((record.orig_price - 12.99).abs() < 1e-9);
        assert!(record.orig_old_price.is_nan());
    }

    #[test]
    fn text_fields_accept_numbers() {
        let mut record = Record::default();
        record.set(Field::Stock, Cell::Number(3.0));
        assert_eq!(record.stock.as_deref(), Some("3"));
        record.set(Field::Stock, Cell::Empty);
        assert_eq!(record.stock, None);
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("msrp"), None);
    }

    #[test]
    fn sort_is_discount_descending_then_title() {
        let mut table = Table::new(vec![
            row("b", 10.0),
            row("z", f64::NAN),
            row("a", 10.0),
            row("c", 50.0),
            row("a", f64::NAN),
        ]);
        table.sort_by_discount();
        let order: Vec<_> = table
            .iter()
            .map(|r| (r.title.clone().unwrap_or_default(), r.discount))
            .map(|(t, d)| format!("{t}:{d}"))
            .collect();
        assert_eq!(order, vec!["c:50", "a:10", "b:10", "a:NaN", "z:NaN"]);
    }

    #[test]
    fn to_strings_blanks_nan() {
        let table = Table::single(row("x", f64::NAN));
        let grid = table.to_strings(&[Column::Field(Field::Title), Column::Field(Field::Discount)]);
        assert_eq!(grid, vec![vec!["x".to_string(), String::new()]]);
    }

    #[test]
    fn others_render_as_json_object() {
        let mut record = Record::default();
        record.others.insert("msrp".into(), serde_json::json!(19.99));
        assert_eq!(record.value(Column::Others), Cell::Text("{\"msrp\":19.99}".into()));
    }
}
