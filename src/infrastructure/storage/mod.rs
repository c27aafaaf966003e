//! File-system storage for uploaded documents.

pub mod staging;

pub use staging::{StagingArea, PARTIAL_SUFFIX};
