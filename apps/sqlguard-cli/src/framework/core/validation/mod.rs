//! Policy validation for machine-generated SQL.
//!
//! Validation failures are data, not errors: callers always get a
//! [`ValidationResult`] listing every violation found.

pub mod policy;
pub use policy::*;
