//! Configuration loading, overrides and validation.

pub mod loader;
pub mod model;

pub use model::BatchConfig;
