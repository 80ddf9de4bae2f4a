//! Centralized error handling for the IPTV aggregator
//!
//! Errors are split by the layer that raises them. Only [`AppError`] ever
//! reaches the caller of a pipeline run; every other type is recovered
//! locally by the component that produced it.
//!
//! # Error Categories
//!
//! - **Source Errors**: a playlist source could not be fetched or was not a playlist
//! - **Transport Errors**: the HTTP collaborator failed a fetch or probe
//! - **Playlist Errors**: document-level parse failures
//! - **Application Errors**: configuration and output failures, surfaced to the caller
//!
//! # Usage
//!
//! ```rust
//! use iptv_aggregator::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("probe.max_concurrent must be > 0"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
