//! Data contracts passed between the stages of the sensor training pipeline.

mod artifact;
mod drift;
mod schema;
mod target;

pub use artifact::*;
pub use drift::*;
pub use schema::*;
pub use target::*;
