//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment: defaults, YAML files and
//! `LEXRAG_*` environment overrides, validated after loading.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
