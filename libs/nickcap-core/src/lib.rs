pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod gate;
pub mod integration;
pub mod store;
