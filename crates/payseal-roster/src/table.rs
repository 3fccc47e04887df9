// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory tabular input — rows of string-keyed cells.
//
// Decoding a spreadsheet container is the host's job; the engine only sees
// the decoded rows. `from_json` accepts the common hand-off shape (an array
// of objects) for hosts that already hold the sheet as JSON.

use std::collections::BTreeMap;

use payseal_core::error::{PaysealError, Result};
use serde_json::Value;
use tracing::{debug, instrument};

/// One decoded row: header name to cell text.
pub type Row = BTreeMap<String, String>;

/// A decoded table in source row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularInput {
    rows: Vec<Row>,
}

impl TabularInput {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Decode a JSON array of objects.
    ///
    /// Strings are kept as-is, numbers and booleans are stringified, nulls
    /// become empty cells. Anything else is a parse error.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|e| PaysealError::Parse(format!("not valid JSON: {e}")))?;

        let Value::Array(items) = value else {
            return Err(PaysealError::Parse(
                "expected a JSON array of row objects".into(),
            ));
        };

        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(fields) = item else {
                return Err(PaysealError::Parse(format!(
                    "row {} is not an object",
                    index + 1
                )));
            };

            let mut row = Row::new();
            for (header, cell) in fields {
                let text = cell_text(&cell).ok_or_else(|| {
                    PaysealError::Parse(format!(
                        "row {} column {header:?} holds a nested value",
                        index + 1
                    ))
                })?;
                row.insert(header, text);
            }
            rows.push(row);
        }

        debug!(rows = rows.len(), "decoded tabular JSON");
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<Row> for TabularInput {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Spreadsheet exports often carry integral IDs as floats (`8001015009087.0`);
/// those are rendered without the fraction.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}
