//! JSON transformers.
//!
//! Cells render with JSON's native types where one exists. Blobs (which
//! include raw json/jsonb documents captured from Postgres) become standard
//! base64 strings, and non-finite floats become `null`. Object key order
//! follows the record's map and is unspecified.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use super::Transformer;
use crate::db::{CellValue, ResultSet, RowRecord};
use crate::error::{Result, SrtError};

/// Renders the result set as a single JSON array of objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonTransformer {
    pretty: bool,
}

impl JsonTransformer {
    /// Compact output: `[{"id":1},{"id":2}]`.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented, human-readable output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Transformer for JsonTransformer {
    fn transform(&self, result: &ResultSet) -> Result<Vec<u8>> {
        let rows = JsonRows(result.rows());
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&rows)
        } else {
            serde_json::to_vec(&rows)
        }
        .map_err(|e| SrtError::transform(format!("JSON serialization failed: {e}")))?;

        debug!(rows = result.len(), bytes = bytes.len(), "Rendered JSON array");
        Ok(bytes)
    }
}

/// Renders one JSON object per row, each followed by a newline (JSON Lines).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonLinesTransformer;

impl Transformer for JsonLinesTransformer {
    fn transform(&self, result: &ResultSet) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        for (index, row) in result.iter().enumerate() {
            serde_json::to_writer(&mut out, &JsonRow(row)).map_err(|e| {
                SrtError::transform(format!("JSON serialization failed at row {index}: {e}"))
            })?;
            out.push(b'\n');
        }

        debug!(rows = result.len(), bytes = out.len(), "Rendered JSON lines");
        Ok(out)
    }
}

struct JsonRows<'a>(&'a [RowRecord]);

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(JsonRow))
    }
}

struct JsonRow<'a>(&'a RowRecord);

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in self.0 {
            map.serialize_entry(column, &JsonCell(value))?;
        }
        map.end()
    }
}

struct JsonCell<'a>(&'a CellValue);

impl Serialize for JsonCell<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Blob(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}
