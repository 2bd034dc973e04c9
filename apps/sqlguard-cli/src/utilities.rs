pub mod constants;
pub mod dotenv;
