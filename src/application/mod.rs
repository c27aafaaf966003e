//! Application wiring.

pub mod bootstrap;

pub use bootstrap::{Application, Ports, RunningApplication};
