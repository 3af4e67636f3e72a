//! Dataset metadata, queries, chunks and the assembled table.

use chrono::NaiveDateTime;
use qset_codec::{MapKey, Value};
use serde::{Deserialize, Serialize};

use crate::error::{QsetError, Result};
use crate::range::MaxRequestRange;
use crate::timestamp::{self, parse_timestamp};

/// Dataset kind the chunked reader understands.
pub const ASSET_KIND: &str = "asset";

/// One row of values, positionally aligned with the declared columns.
pub type Row = Vec<Value>;

/// `(name, declared_type)` pair as listed in a dataset overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec(pub String, pub String);

impl ColumnSpec {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn declared_type(&self) -> &str {
        &self.1
    }
}

/// Metadata returned by `/dataset_overview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOverview {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    pub columns: Vec<ColumnSpec>,
    /// Raw width token, e.g. `"31d"` (calendar month) or `"1d"`.
    pub max_request_range: String,
    /// Any further fields the service reports (description, source, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DatasetOverview {
    pub fn is_asset(&self) -> bool {
        self.kind == ASSET_KIND
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Parsed maximum request width.
    pub fn request_width(&self) -> Result<MaxRequestRange> {
        self.max_request_range.parse()
    }
}

/// Bounds of the data actually available, from `/asset_dataset_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRange {
    #[serde(rename = "minStartRange", alias = "min_start_range", with = "timestamp")]
    pub min_start: NaiveDateTime,
    #[serde(rename = "maxStartRange", alias = "max_start_range", with = "timestamp")]
    pub max_start: NaiveDateTime,
}

impl AssetRange {
    /// Intersect `[start, end)` with the available window.
    pub fn clamp(&self, start: NaiveDateTime, end: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        (start.max(self.min_start), end.min(self.max_start))
    }
}

/// A caller's request for a slice of an asset dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickers: Option<Vec<String>>,
    /// Subset of columns, in the order they should be returned. Unset or
    /// empty means every column of the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl Query {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            tickers: None,
            columns: None,
        }
    }

    /// Build a query from textual bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_timestamp(start)?, parse_timestamp(end)?))
    }

    /// Parse a JSON query document, e.g.
    /// `{"start": "2020-01-01", "end": "2021-01-01", "tickers": ["AAPL"]}`.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| QsetError::InvalidQuery(e.to_string()))
    }

    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = Some(tickers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Requested columns, or the overview's columns in overview order.
    pub fn resolve_columns(&self, overview: &DatasetOverview) -> Vec<String> {
        match &self.columns {
            Some(cols) if !cols.is_empty() => cols.clone(),
            _ => overview.column_names(),
        }
    }
}

/// The decoded body of one bulk-data response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    pub total: u64,
    pub values: Vec<Row>,
}

impl Chunk {
    /// Interpret a decoded envelope `{"total": n, "values": [[...], ...]}`.
    ///
    /// Both keys are required and `total` must equal the number of rows.
    pub fn from_envelope(envelope: Value) -> std::result::Result<Self, String> {
        let mut map = match envelope {
            Value::Map(map) => map,
            other => return Err(format!("expected a map, got {}", other.type_name())),
        };

        let values = match map.shift_remove(&MapKey::from("values")) {
            Some(Value::Array(rows)) => rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| match row {
                    Value::Array(cells) => Ok(cells),
                    other => Err(format!("row {i} is a {}, not an array", other.type_name())),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(other) => return Err(format!("'values' is a {}, not an array", other.type_name())),
            None => return Err("missing 'values'".to_string()),
        };

        let total = match map.get(&MapKey::from("total")) {
            Some(v) => v
                .as_u64()
                .ok_or_else(|| format!("'total' is not a row count: {v:?}"))?,
            None => return Err("missing 'total'".to_string()),
        };
        if total != values.len() as u64 {
            return Err(format!("'total' is {total} but {} rows were sent", values.len()));
        }

        Ok(Self { total, values })
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// What a chunked read hands to its consumer, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    /// Emitted exactly once, before any values.
    Columns(Vec<String>),
    /// Rows of one non-empty sub-range.
    Values(Vec<Row>),
}

/// In-memory result of a full read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl DatasetTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Value::Nil)))
    }
}
