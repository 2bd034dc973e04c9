//! Everything that talks to a database server.

pub mod db;
