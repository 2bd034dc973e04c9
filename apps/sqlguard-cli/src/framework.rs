//! Validation, estimation and shaping logic. Nothing in here opens a
//! connection or reads configuration.

pub mod core;
pub mod generation;
pub mod pipeline;
pub mod shaping;
pub mod sql;
