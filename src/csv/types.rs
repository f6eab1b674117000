//! Core type definitions for the ingestion pipeline
//!
//! Contains the data types for parsed CSV tables, inferred column kinds,
//! and the derived dataset summary handed to the prompt builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// Core Data Types
// ============================================================================

/// A single row of CSV data represented as a vector of cell values,
/// positionally aligned with the table headers.
pub type CsvRow = Vec<String>;

/// A parsed CSV table. Row order matches the source file; it is significant
/// because sampling (inference, prompts, previews) always takes rows from
/// the front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    /// Column headers from the first line of the file
    pub headers: Vec<String>,
    /// Data rows, each normalized to the header count
    pub rows: Vec<CsvRow>,
}

impl TableData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// The first `limit` rows as JSON objects keyed by column name, the
    /// shape clients and prompts consume.
    pub fn sample_records(&self, limit: usize) -> Vec<Value> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                let mut record = Map::new();
                for (header, cell) in self.headers.iter().zip(row) {
                    record.insert(header.clone(), Value::String(cell.clone()));
                }
                Value::Object(record)
            })
            .collect()
    }
}

// ============================================================================
// Schema Types
// ============================================================================

/// Inferred kind of a column. Decided once at ingestion, from a bounded
/// sample, and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    Date,
    Numeric,
    Categorical,
    Empty,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Date => "date",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Empty => "empty",
        }
    }
}

/// Per-column metadata in a dataset summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
}

/// Aggregate statistics for a numeric column, computed over every row that
/// parses as a number (not just the inference sample).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAggregate {
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Derived view of a dataset: row count, column kinds, and numeric
/// aggregates. Fully determined by the rows at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub columns: Vec<ColumnSummary>,
    /// Keyed by column name; columns with zero parseable values are absent.
    pub numeric_aggregates: BTreeMap<String, NumericAggregate>,
}

impl DatasetSummary {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Typed error enum for CSV ingestion.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to parse the CSV content at all
    #[error("failed to parse CSV: {message}")]
    Parse { message: String },

    /// The file has no header line
    #[error("CSV file has no header row")]
    NoHeaders,

    /// The file parsed but contains zero data rows
    #[error("CSV file contains no data rows")]
    NoRows,
}
