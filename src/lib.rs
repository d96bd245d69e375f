pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod query;
pub mod table;
