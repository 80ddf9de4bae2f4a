//! Liveness probing under a global concurrency cap

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::trace;

use crate::config::ProbeConfig;
use crate::models::{Channel, ProbeOutcome, ProbeStatus};
use crate::utils::http_client::{HttpTransport, ProbeResponse};
use crate::utils::status_code_matcher::is_status_acceptable;
use crate::utils::url::UrlUtils;

pub struct LivenessProber {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
    accepted_statuses: Vec<String>,
    max_latency: Option<Duration>,
}

impl LivenessProber {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ProbeConfig) -> Self {
        Self {
            transport,
            limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            timeout: config.timeout,
            accepted_statuses: config.accepted_statuses.clone(),
            max_latency: config.max_latency,
        }
    }

    /// Probes currently allowed to start
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Probe one channel and record the result on it.
    ///
    /// A channel that already carries a result is not probed again; the
    /// returned status is always the one recorded on the channel.
    pub async fn probe(&self, channel: &mut Channel) -> ProbeStatus {
        if channel.probe_status() == ProbeStatus::Unchecked {
            let outcome = self.check(channel.url()).await;
            channel.record_probe(outcome);
        }
        channel.probe_status()
    }

    /// Probe a batch concurrently; returns how many channels are working
    pub async fn probe_all(&self, channels: &mut [Channel]) -> usize {
        join_all(channels.iter_mut().map(|channel| self.probe(channel))).await;
        channels.iter().filter(|channel| channel.is_working()).count()
    }

    async fn check(&self, url: &str) -> ProbeOutcome {
        let Ok(_permit) = self.limiter.acquire().await else {
            return ProbeOutcome::Dead;
        };

        match timeout(self.timeout, self.transport.probe(url, self.timeout)).await {
            Ok(Ok(response)) => self.classify(response),
            Ok(Err(e)) => {
                trace!("Probe failed: url={} error={}", UrlUtils::obfuscate_credentials(url), e);
                ProbeOutcome::Dead
            }
            Err(_) => {
                trace!("Probe timed out: url={}", UrlUtils::obfuscate_credentials(url));
                ProbeOutcome::Dead
            }
        }
    }

    pub fn classify(&self, response: ProbeResponse) -> ProbeOutcome {
        if !is_status_acceptable(response.status, &self.accepted_statuses) {
            return ProbeOutcome::Dead;
        }
        if self.max_latency.is_some_and(|max| response.elapsed > max) {
            return ProbeOutcome::Dead;
        }
        ProbeOutcome::Working {
            latency_ms: response.elapsed.as_micros() as f64 / 1000.0,
        }
    }
}
