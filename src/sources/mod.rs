pub mod fetcher;

pub use fetcher::{SourceFetcher, SourceOutcome, SourceRef};
