use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::csv::{DatasetSummary, TableData};

/// An ingested dataset: rows plus the summary derived from them at
/// ingestion time. Immutable once stored; the summary is never recomputed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub table: TableData,
    pub summary: DatasetSummary,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing entry for a stored dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub row_count: usize,
    pub column_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Dataset> for DatasetInfo {
    fn from(dataset: &Dataset) -> Self {
        Self {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            row_count: dataset.table.row_count(),
            column_count: dataset.table.column_count(),
            uploaded_at: dataset.uploaded_at,
        }
    }
}
