//! Domain layer for lexrag
//!
//! Core models, errors, and the ports the ingestion and retrieval services
//! depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
