pub mod complexity;
pub mod schema;
pub mod validation;
