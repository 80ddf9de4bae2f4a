//! Error type definitions for the IPTV aggregator

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type
///
/// These are the only failures a pipeline run propagates. Remote sources
/// and probes never produce one of these; they degrade to "no channels" or
/// `DEAD` inside their own component.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The final playlist could not be written
    #[error("Failed to write output '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source handling specific errors
///
/// Every variant is recovered by the source fetcher as "this source
/// contributed zero channels".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The fetch did not complete within the source timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Non-2xx response after the retry budget was spent
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Connection, TLS or body read failure
    #[error("Transport error: {url} - {message}")]
    Transport { url: String, message: String },

    /// The document carried no entry-metadata markers
    #[error("Invalid playlist: {url}")]
    NotAPlaylist { url: String },
}

impl SourceError {
    /// Short machine-friendly label, used in progress events
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Timeout { .. } => "timeout",
            SourceError::Http { .. } => "http_status",
            SourceError::Transport { .. } => "transport",
            SourceError::NotAPlaylist { .. } => "invalid_playlist",
        }
    }
}

/// Errors returned by an [`HttpTransport`](crate::utils::http_client::HttpTransport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Document-level playlist parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// No `#EXTINF` marker anywhere in the document
    #[error("document contains no #EXTINF entries")]
    NoEntryMarkers,
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an output error for the given path
    pub fn output<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_kinds() {
        let url = "http://example.com/list.m3u".to_string();
        assert_eq!(SourceError::Timeout { url: url.clone() }.kind(), "timeout");
        assert_eq!(
            SourceError::Http { status: 503, url: url.clone() }.kind(),
            "http_status"
        );
        assert_eq!(SourceError::NotAPlaylist { url }.kind(), "invalid_playlist");
    }

    #[test]
    fn test_output_error_message_includes_path() {
        let err = AppError::output(
            "/tmp/out/playlist.m3u",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/out/playlist.m3u"));
        assert!(message.contains("denied"));
    }
}
