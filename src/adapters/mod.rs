//! Adapters for external systems: embedding and completion APIs, PDF
//! extraction, and the HTTP surface.

pub mod completion;
pub mod embeddings;
pub mod http;
pub mod pdf;
