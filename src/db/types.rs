//! Materialized result types.
//!
//! A query's rows are captured into [`ResultSet`], an ordered list of
//! [`RowRecord`]s. Each record maps column names to [`CellValue`]s, a closed
//! tagged union over the value kinds a driver can report for a single cell.

use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

/// Represents a single cell captured from a database row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data, including raw JSON documents handed back by the driver.
    Blob(Vec<u8>),
}

/// The tag of a [`CellValue`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Blob,
}

impl CellKind {
    /// Returns the lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CellValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns the tag of this value.
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Null => CellKind::Null,
            CellValue::Bool(_) => CellKind::Bool,
            CellValue::Int(_) => CellKind::Int,
            CellValue::Float(_) => CellKind::Float,
            CellValue::Text(_) => CellKind::Text,
            CellValue::Blob(_) => CellKind::Blob,
        }
    }

    /// Returns a human-readable rendering of the value.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Blob(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i16> for CellValue {
    fn from(v: i16) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

/// Widens through the shortest decimal form, so a stored `1.2f32` stays
/// `1.2` instead of becoming `1.2000000476837158`.
impl From<f32> for CellValue {
    fn from(v: f32) -> Self {
        CellValue::Float(v.to_string().parse().unwrap_or(f64::from(v)))
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        CellValue::Blob(v)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => CellValue::Null,
        }
    }
}

/// One captured row, keyed by column name.
///
/// Iteration order over the keys is unspecified and need not match the
/// order of the query's columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    cells: HashMap<String, CellValue>,
}

impl RowRecord {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: HashMap::with_capacity(capacity),
        }
    }

    /// Stores a cell, returning the previous value if the name was already taken.
    pub(crate) fn insert(&mut self, column: String, value: CellValue) -> Option<CellValue> {
        self.cells.insert(column, value)
    }

    /// Returns the value for the given column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Returns true if the record has a cell for the given column.
    pub fn contains_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over the column names in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Iterates over `(column, value)` pairs in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, CellValue> {
        self.cells.iter()
    }
}

impl FromIterator<(String, CellValue)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RowRecord {
    type Item = (&'a String, &'a CellValue);
    type IntoIter = hash_map::Iter<'a, String, CellValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// The fully materialized rows of one query, in cursor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<RowRecord>,
}

impl ResultSet {
    /// Creates a result set from discovered column names and captured rows.
    pub fn new(columns: Vec<String>, rows: Vec<RowRecord>) -> Self {
        Self { columns, rows }
    }

    /// Column names as reported by the query's result schema, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consumes the result set, returning its rows.
    pub fn into_rows(self) -> Vec<RowRecord> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowRecord> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a RowRecord;
    type IntoIter = std::slice::Iter<'a, RowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = RowRecord;
    type IntoIter = std::vec::IntoIter<RowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
