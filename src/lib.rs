pub mod config;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod utils;
