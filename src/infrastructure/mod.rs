//! Infrastructure layer module
//!
//! Concrete implementations behind the domain: configuration loading,
//! logging, document staging and the vector index.

pub mod config;
pub mod logging;
pub mod storage;
pub mod vector;
