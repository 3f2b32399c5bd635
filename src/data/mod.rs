//! Data module - CSV loading, merging and cleaning

mod loader;
mod processor;
mod records;

pub use loader::{DataLoader, LoadError};
pub use processor::{DataProcessor, Deduplicated};
pub use records::{MergedRecord, Observation, SubjectRecord};
