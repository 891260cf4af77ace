pub mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod features;
pub mod handlers;
pub mod parser;
pub mod schema;
pub mod utils;

pub use data::DbPool;
