use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::csv::{DatasetSummary, TableData};
use crate::dataset::types::{Dataset, DatasetInfo};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset capacity reached ({0} datasets)")]
    AtCapacity(usize),
}

/// In-memory dataset store.
///
/// Entries are written once at ingestion and never mutated; readers get an
/// `Arc` to the stored dataset. Identifiers are random UUIDs, so concurrent
/// inserts within the same instant cannot collide. There is no delete and
/// no eviction; memory grows with every upload until the configured
/// capacity refuses further inserts.
pub struct DatasetStore {
    max_datasets: usize,
    datasets: RwLock<HashMap<String, Arc<Dataset>>>,
}

impl DatasetStore {
    pub fn new(max_datasets: usize) -> Self {
        Self {
            max_datasets,
            datasets: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a freshly ingested dataset, assigning its identifier.
    pub fn insert(
        &self,
        name: String,
        description: String,
        table: TableData,
        summary: DatasetSummary,
    ) -> Result<Arc<Dataset>, StoreError> {
        let dataset = Arc::new(Dataset {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            table,
            summary,
            uploaded_at: Utc::now(),
        });

        let mut datasets = self.datasets.write();
        if datasets.len() >= self.max_datasets {
            return Err(StoreError::AtCapacity(self.max_datasets));
        }
        datasets.insert(dataset.id.clone(), Arc::clone(&dataset));

        Ok(dataset)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Dataset>> {
        self.datasets.read().get(id).cloned()
    }

    /// Listing of all stored datasets, most recent upload first.
    pub fn list(&self) -> Vec<DatasetInfo> {
        let mut infos: Vec<DatasetInfo> = self
            .datasets
            .read()
            .values()
            .map(|d| DatasetInfo::from(d.as_ref()))
            .collect();
        infos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        infos
    }

    pub fn len(&self) -> usize {
        self.datasets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }
}
