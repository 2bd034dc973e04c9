#[macro_use]
pub mod cli;
pub mod framework;
pub mod infrastructure;
pub mod utilities;
