//! Bundled sample datasets
//!
//! A fixed registry of demo CSVs that can be ingested without an upload.

use std::path::Path;

/// One bundled sample.
#[derive(Debug, Clone, Copy)]
pub struct SampleDataset {
    pub key: &'static str,
    pub file: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const SAMPLE_DATASETS: &[SampleDataset] = &[
    SampleDataset {
        key: "ecommerce",
        file: "ecommerce-sales.csv",
        name: "E-commerce Sales Analytics Demo",
        description: "Order-level revenue with channel and category breakdowns",
    },
    SampleDataset {
        key: "saas",
        file: "saas-metrics.csv",
        name: "SaaS Growth Metrics Demo",
        description: "MRR/ARR tracking with customer movement",
    },
    SampleDataset {
        key: "restaurant",
        file: "restaurant-daily-pnl.csv",
        name: "Restaurant P&L Analysis Demo",
        description: "Daily profit & loss with operational metrics",
    },
    SampleDataset {
        key: "consulting",
        file: "consulting-revenue.csv",
        name: "Consulting Revenue Analysis Demo",
        description: "Project-based revenue with client satisfaction",
    },
    SampleDataset {
        key: "retail",
        file: "retail-inventory.csv",
        name: "Retail Inventory Intelligence Demo",
        description: "Stock levels and reorder economics by SKU",
    },
];

pub fn find_sample(key: &str) -> Option<&'static SampleDataset> {
    SAMPLE_DATASETS.iter().find(|s| s.key == key)
}

pub async fn read_sample(dir: &Path, sample: &SampleDataset) -> std::io::Result<String> {
    tokio::fs::read_to_string(dir.join(sample.file)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sample() {
        assert!(find_sample("ecommerce").is_some());
        assert!(find_sample("saas").is_some());
        assert!(find_sample("bogus").is_none());
    }

    #[test]
    fn test_sample_keys_are_unique() {
        let mut keys: Vec<&str> = SAMPLE_DATASETS.iter().map(|s| s.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SAMPLE_DATASETS.len());
    }
}
