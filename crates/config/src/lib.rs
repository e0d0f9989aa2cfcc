//! Configuration for the sensor training pipeline.
//!
//! Holds the fixed pipeline constants, the run-scoped directory layout of
//! every stage, the environment-driven settings and the artifact store.

pub mod constants;
mod pipeline;
mod settings;
mod store;

pub use pipeline::*;
pub use settings::*;
pub use store::*;
