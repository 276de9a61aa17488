pub mod capacity;
pub mod config;
pub mod error;
pub mod market;
pub mod output;
pub mod parser;
pub mod schema;
