//! HTTP adapter (axum).

pub mod error;
pub mod server;

pub use error::{ApiError, ErrorModel};
pub use server::{build_router, AppState, HttpServer, JOB_ID_HEADER};
