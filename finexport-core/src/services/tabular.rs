//! Tabular writer - rows to CSV payloads and destination keys

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::Record;

/// Header written when there are no rows at all
pub const EMPTY_HEADER: &str = "id";

/// Key timestamp format, UTC with second resolution
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Serializes rows to CSV and names the objects they are stored under
#[derive(Debug, Clone)]
pub struct TabularWriter {
    prefix: String,
}

impl TabularWriter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Serialize rows with a header inferred from the rows themselves
    ///
    /// The header is the first row's keys followed by any key first seen in a
    /// later row. An empty sequence yields a header-only `id` payload.
    pub fn serialize(&self, rows: &[Record]) -> Result<Vec<u8>> {
        self.serialize_with_columns(&[], rows)
    }

    /// Serialize rows with an explicit leading column schema
    ///
    /// Keys the schema does not name are appended in first-seen order, so no
    /// field is ever dropped. Schema columns absent from a row are empty.
    pub fn serialize_with_columns(&self, columns: &[String], rows: &[Record]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        if rows.is_empty() {
            writer.write_record([EMPTY_HEADER])?;
        } else {
            let header = resolve_columns(columns, rows);
            writer.write_record(&header)?;
            for row in rows {
                writer.write_record(
                    header
                        .iter()
                        .map(|column| row.get(column).map(stringify).unwrap_or_default()),
                )?;
            }
        }

        writer.into_inner().map_err(|e| Error::Io(e.into_error()))
    }

    /// Destination key: `{prefix}/{dataset}_{YYYYMMDDTHHMMSSZ}.csv`
    pub fn compute_key(&self, dataset: &str, timestamp: DateTime<Utc>) -> String {
        let name = format!("{}_{}.csv", dataset, timestamp.format(KEY_TIMESTAMP_FORMAT));
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

/// Render one cell
///
/// Null is empty, scalars use their literal form, containers become compact
/// JSON so a cell never holds a raw structure dump.
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn resolve_columns(columns: &[String], rows: &[Record]) -> Vec<String> {
    let mut header: Vec<String> = Vec::with_capacity(columns.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());

    for column in columns {
        if seen.insert(column.as_str()) {
            header.push(column.clone());
        }
    }
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                header.push(key.clone());
            }
        }
    }
    header
}
