//! Dataset ownership and lookup
//!
//! Ingested datasets live here for the life of the process.

pub mod store;
pub mod types;

pub use store::{DatasetStore, StoreError};
pub use types::{Dataset, DatasetInfo};
