//! Source document retrieval
//!
//! Only non-2xx responses are retried. Timeouts, transport failures and
//! documents without entry markers end the attempt immediately, and every
//! failure is reported as a source that contributed nothing.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::config::FetchConfig;
use crate::errors::{SourceError, SourceResult, TransportError};
use crate::ingestor::PlaylistDocument;
use crate::models::{Category, RawEntry};
use crate::observability::{EventSink, PipelineEvent};
use crate::utils::http_client::HttpTransport;
use crate::utils::url::UrlUtils;

/// One configured `(category, url)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub category: Category,
    pub url: String,
}

impl SourceRef {
    pub fn new<C: Into<Category>, U: Into<String>>(category: C, url: U) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: SourceRef,
    pub result: SourceResult<Vec<RawEntry>>,
    pub attempts: u32,
}

impl SourceOutcome {
    /// Entries contributed by this source; empty on any failure
    pub fn into_entries(self) -> Vec<RawEntry> {
        self.result.unwrap_or_default()
    }
}

pub struct SourceFetcher {
    transport: Arc<dyn HttpTransport>,
    config: FetchConfig,
    sink: Arc<dyn EventSink>,
}

impl SourceFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: FetchConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            config,
            sink,
        }
    }

    /// Fetch and parse one source. Never fails past this boundary.
    pub async fn fetch(&self, source: SourceRef) -> SourceOutcome {
        let (body, attempts) = self.fetch_document(&source.url).await;
        let result = body.and_then(|text| {
            PlaylistDocument::parse(&text)
                .map(|document| document.entries().collect::<Vec<_>>())
                .map_err(|_| SourceError::NotAPlaylist {
                    url: source.url.clone(),
                })
        });

        let event = match &result {
            Ok(entries) => PipelineEvent::SourceFetched {
                category: source.category.clone(),
                url: source.url.clone(),
                entries: entries.len(),
                attempts,
            },
            Err(error) => PipelineEvent::SourceFailed {
                category: source.category.clone(),
                url: source.url.clone(),
                error: error.clone(),
                attempts,
            },
        };
        self.sink.emit(event);

        SourceOutcome {
            source,
            result,
            attempts,
        }
    }

    async fn fetch_document(&self, url: &str) -> (SourceResult<String>, u32) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let fetch = self.transport.fetch_text(url, self.config.timeout);
            let outcome = match timeout(self.config.timeout, fetch).await {
                Err(_) => Err(TransportError::Timeout),
                Ok(result) => result,
            };

            match outcome {
                Ok(response) if response.is_success() => return (Ok(response.body), attempts),
                Ok(response) => {
                    if attempts > self.config.max_retries {
                        return (
                            Err(SourceError::Http {
                                status: response.status,
                                url: url.to_string(),
                            }),
                            attempts,
                        );
                    }
                    debug!(
                        "Retrying source after HTTP {}: attempt={} url={}",
                        response.status,
                        attempts,
                        UrlUtils::obfuscate_credentials(url)
                    );
                    if self.config.retry_backoff > Duration::ZERO {
                        sleep(self.config.retry_backoff).await;
                    }
                }
                Err(TransportError::Timeout) => {
                    return (Err(SourceError::Timeout { url: url.to_string() }), attempts);
                }
                Err(TransportError::Connection(message)) => {
                    return (
                        Err(SourceError::Transport {
                            url: url.to_string(),
                            message,
                        }),
                        attempts,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryEventSink;
    use crate::utils::http_client::{FetchResponse, ProbeResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed sequence of fetch results
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<FetchResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<FetchResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn fetch_text(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<FetchResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TransportError::Connection("exhausted".to_string())))
        }

        async fn probe(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> Result<ProbeResponse, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    fn ok(status: u16, body: &str) -> Result<FetchResponse, TransportError> {
        Ok(FetchResponse {
            status,
            body: body.to_string(),
        })
    }

    fn config(max_retries: u32) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(5),
            max_retries,
            retry_backoff: Duration::ZERO,
        }
    }

    const PLAYLIST: &str = "#EXTM3U\n#EXTINF:-1,News One\nhttp://example.com/news\n";

    fn source() -> SourceRef {
        SourceRef::new("tv", "http://example.com/list.m3u")
    }

    #[tokio::test]
    async fn test_success_parses_entries() {
        let transport = ScriptedTransport::new(vec![ok(200, PLAYLIST)]);
        let sink = Arc::new(MemoryEventSink::new());
        let fetcher = SourceFetcher::new(transport.clone(), config(1), sink.clone());

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.into_entries().len(), 1);
        assert!(matches!(
            sink.events()[0],
            PipelineEvent::SourceFetched { entries: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_non_success_status_is_retried() {
        let transport = ScriptedTransport::new(vec![ok(503, ""), ok(200, PLAYLIST)]);
        let fetcher =
            SourceFetcher::new(transport.clone(), config(1), Arc::new(MemoryEventSink::new()));

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.is_ok());
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let transport = ScriptedTransport::new(vec![ok(503, ""), ok(502, ""), ok(200, PLAYLIST)]);
        let fetcher =
            SourceFetcher::new(transport.clone(), config(1), Arc::new(MemoryEventSink::new()));

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            outcome.result,
            Err(SourceError::Http {
                status: 502,
                url: source().url
            })
        );
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let transport =
            ScriptedTransport::new(vec![Err(TransportError::Timeout), ok(200, PLAYLIST)]);
        let fetcher =
            SourceFetcher::new(transport.clone(), config(3), Arc::new(MemoryEventSink::new()));

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.result, Err(SourceError::Timeout { .. })));
        assert!(outcome.into_entries().is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Connection(
            "refused".to_string(),
        ))]);
        let fetcher =
            SourceFetcher::new(transport.clone(), config(3), Arc::new(MemoryEventSink::new()));

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(SourceError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_document_without_markers_is_invalid() {
        let transport = ScriptedTransport::new(vec![ok(200, "<html>gone</html>")]);
        let sink = Arc::new(MemoryEventSink::new());
        let fetcher = SourceFetcher::new(transport.clone(), config(3), sink.clone());

        let outcome = fetcher.fetch(source()).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.result, Err(SourceError::NotAPlaylist { .. })));
        match &sink.events()[0] {
            PipelineEvent::SourceFailed { error, .. } => {
                assert_eq!(error.kind(), "invalid_playlist")
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
