//! CSV processing logic
//!
//! Handles CSV parsing, column-kind inference, and aggregate statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::csv::types::{
    ColumnKind, ColumnSummary, CsvError, CsvRow, DatasetSummary, NumericAggregate, TableData,
};

// ============================================================================
// Constants for Kind Inference
// ============================================================================

/// Maximum number of rows sampled per column for kind inference
const KIND_INFERENCE_SAMPLE_ROWS: usize = 100;

/// Minimum share of sampled values that must parse as numbers for a column
/// to classify as numeric
const NUMERIC_MATCH_THRESHOLD: f64 = 0.7;

// ============================================================================
// Parsing
// ============================================================================

/// Parse CSV content from a string, using the first line as the header.
///
/// # Arguments
/// * `content` - Raw CSV text
///
/// # Returns
/// * `TableData` with headers and normalized rows
///
/// # Behavior
/// - Handles variable column counts: short rows are padded with empty
///   strings, long rows are truncated to the header count
/// - Skips rows the parser rejects outright, with a warning
/// - Fails with `CsvError::NoRows` when zero data rows remain
pub fn parse_table(content: &str) -> Result<TableData, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::Parse {
            message: format!("failed to parse CSV headers: {}", e),
        })?
        .iter()
        .map(|s| s.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let header_count = headers.len();
    let mut rows: Vec<CsvRow> = Vec::new();
    let mut skipped_rows: usize = 0;

    for (line_number, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                rows.push(normalize_row(&record, header_count));
            }
            Err(e) => {
                skipped_rows += 1;
                tracing::warn!(
                    "skipping malformed row {} in CSV: {}",
                    line_number + 2, // +2 for 1-based indexing and header row
                    e
                );
            }
        }
    }

    if skipped_rows > 0 {
        tracing::info!(
            "CSV parsing complete: {} rows parsed, {} rows skipped",
            rows.len(),
            skipped_rows
        );
    }

    if rows.is_empty() {
        return Err(CsvError::NoRows);
    }

    Ok(TableData { headers, rows })
}

/// Normalize a CSV record to match the expected column count.
///
/// - If the record has fewer columns than headers, pad with empty strings
/// - If the record has more columns than headers, truncate
fn normalize_row(record: &csv::StringRecord, header_count: usize) -> CsvRow {
    let mut row: CsvRow = record.iter().map(|s| s.to_string()).collect();

    while row.len() < header_count {
        row.push(String::new());
    }
    row.truncate(header_count);

    row
}

// ============================================================================
// Kind Inference
// ============================================================================

/// Infer the kind of a column from a sample of its values.
///
/// The sample is the non-empty values among the column's first
/// `KIND_INFERENCE_SAMPLE_ROWS` rows. Classification is a single
/// deterministic pass:
///
/// 1. No non-empty values in the sample -> `Empty`
/// 2. Any sampled value parses as a date -> `Date`. The date check runs
///    before the numeric check: columns of year-like integers classify as
///    dates, which downstream prompt content depends on.
/// 3. At least 70% of sampled values parse as numbers (after stripping
///    comma and currency characters) -> `Numeric`
/// 4. Otherwise -> `Categorical`
pub fn infer_column_kind<'a, I>(sample: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let non_empty: Vec<&str> = sample
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    if non_empty.is_empty() {
        return ColumnKind::Empty;
    }

    if non_empty.iter().any(|v| parses_as_date(v)) {
        return ColumnKind::Date;
    }

    let numeric_count = non_empty.iter().filter(|v| parse_number(v).is_some()).count();
    if numeric_count as f64 >= non_empty.len() as f64 * NUMERIC_MATCH_THRESHOLD {
        return ColumnKind::Numeric;
    }

    ColumnKind::Categorical
}

/// Date layouts accepted by the lenient date check.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Datetime layouts accepted by the lenient date check.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Lenient date detection over a fixed set of common layouts.
///
/// Month precision ("2024-01") and bare four-digit years ("2024") count as
/// dates; the date-before-numeric tie-break for year-like columns relies
/// on this.
fn parses_as_date(value: &str) -> bool {
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }
    if DATETIME_FORMATS
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
    {
        return true;
    }
    if DATE_FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(value, f).is_ok())
    {
        return true;
    }

    // Month precision: YYYY-MM
    if let Some((year, month)) = value.split_once('-') {
        if year.len() == 4
            && month.len() == 2
            && year.chars().all(|c| c.is_ascii_digit())
            && month.chars().all(|c| c.is_ascii_digit())
        {
            return month
                .parse::<u32>()
                .map(|m| (1..=12).contains(&m))
                .unwrap_or(false);
        }
    }

    // Bare four-digit years
    value.len() == 4 && value.chars().all(|c| c.is_ascii_digit())
}

/// Parse a cell as a number after stripping comma grouping and currency
/// symbols. Non-finite results are rejected so aggregates never see
/// NaN/Infinity.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace([',', '$', '£', '€'], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ============================================================================
// Summarization
// ============================================================================

/// Derive the full summary for a parsed table: column kinds plus aggregate
/// statistics for every numeric column.
///
/// Aggregation walks every row (not just the inference sample), skipping
/// cells that fail to parse. Columns where nothing parses are omitted from
/// the aggregate map entirely.
pub fn summarize(table: &TableData) -> DatasetSummary {
    let columns: Vec<ColumnSummary> = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let sample = table
                .rows
                .iter()
                .take(KIND_INFERENCE_SAMPLE_ROWS)
                .map(|row| row[idx].as_str());
            ColumnSummary {
                name: name.clone(),
                kind: infer_column_kind(sample),
            }
        })
        .collect();

    let mut numeric_aggregates = BTreeMap::new();
    for (idx, column) in columns.iter().enumerate() {
        if column.kind != ColumnKind::Numeric {
            continue;
        }
        if let Some(aggregate) = aggregate_column(table, idx) {
            numeric_aggregates.insert(column.name.clone(), aggregate);
        }
    }

    DatasetSummary {
        total_rows: table.row_count(),
        columns,
        numeric_aggregates,
    }
}

/// Compute count/total/average/min/max over the parseable values of one
/// column. Returns `None` when no value parses.
fn aggregate_column(table: &TableData, idx: usize) -> Option<NumericAggregate> {
    let values: Vec<f64> = table
        .rows
        .iter()
        .filter_map(|row| parse_number(&row[idx]))
        .collect();

    if values.is_empty() {
        return None;
    }

    let total: f64 = values.iter().sum();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Some(NumericAggregate {
        total,
        average: total / values.len() as f64,
        min,
        max,
        count: values.len(),
    })
}
