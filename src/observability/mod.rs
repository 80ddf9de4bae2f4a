//! Structured progress events for a pipeline run
//!
//! The pipeline reports through an [`EventSink`] handed to it at
//! construction. [`TracingEventSink`] renders events as log records;
//! [`MemoryEventSink`] keeps them for inspection.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::Display;
use tracing::{debug, info, warn};

use crate::errors::SourceError;
use crate::models::{Category, Channel};
use crate::utils::human_format::format_elapsed;
use crate::utils::url::UrlUtils;

/// Post-probe reduction steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FilterStage {
    Liveness,
    Eligibility,
    Latency,
    UrlDedup,
    IdentityDedup,
}

/// Where the budget ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunPhase {
    Fetch,
    Probe,
}

/// Counts by quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualityBreakdown {
    /// 100 and above (UHD, optionally with codec bonus)
    pub uhd: usize,
    /// 80 to 99
    pub fhd: usize,
    /// 51 to 79 (unknown resolution with codec bonus)
    pub enhanced: usize,
    /// exactly 50
    pub unknown: usize,
}

impl QualityBreakdown {
    pub fn from_channels(channels: &[Channel]) -> Self {
        channels
            .iter()
            .fold(Self::default(), |mut acc, channel| {
                match channel.quality_score() {
                    100.. => acc.uhd += 1,
                    80..=99 => acc.fhd += 1,
                    51..=79 => acc.enhanced += 1,
                    50 => acc.unknown += 1,
                    _ => {}
                }
                acc
            })
    }
}

/// Counts by latency tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyBreakdown {
    pub excellent: usize,
    pub good: usize,
    pub acceptable: usize,
}

impl LatencyBreakdown {
    pub fn from_channels(channels: &[Channel], excellent: Duration, good: Duration) -> Self {
        let excellent_ms = excellent.as_secs_f64() * 1000.0;
        let good_ms = good.as_secs_f64() * 1000.0;
        channels
            .iter()
            .fold(Self::default(), |mut acc, channel| {
                let latency = channel.latency_ms();
                if latency <= excellent_ms {
                    acc.excellent += 1;
                } else if latency <= good_ms {
                    acc.good += 1;
                } else {
                    acc.acceptable += 1;
                }
                acc
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted {
        sources: usize,
    },
    SourceFetched {
        category: Category,
        url: String,
        entries: usize,
        attempts: u32,
    },
    SourceFailed {
        category: Category,
        url: String,
        error: SourceError,
        attempts: u32,
    },
    PreFiltered {
        parsed: usize,
        eligible: usize,
    },
    ProbeBatchCompleted {
        batch: usize,
        total_batches: usize,
        probed: usize,
        total: usize,
        working: usize,
    },
    BudgetExhausted {
        phase: RunPhase,
        /// Sources or channels left without a result
        abandoned: usize,
    },
    FilterApplied {
        stage: FilterStage,
        before: usize,
        after: usize,
    },
    QualityReport(QualityBreakdown),
    LatencyReport(LatencyBreakdown),
    OutputWritten {
        path: PathBuf,
        channels: usize,
        bytes: usize,
    },
    NoOutput {
        reason: String,
    },
    RunFinished {
        channels: usize,
        elapsed: Duration,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Renders events as `tracing` records
#[derive(Debug, Clone)]
pub struct TracingEventSink {
    progress_every_batches: usize,
}

impl TracingEventSink {
    pub fn new(progress_every_batches: usize) -> Self {
        Self {
            progress_every_batches: progress_every_batches.max(1),
        }
    }
}

impl Default for TracingEventSink {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_PROGRESS_LOG_EVERY_BATCHES)
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { sources } => {
                info!("Aggregation STARTED: sources={}", sources);
            }
            PipelineEvent::SourceFetched {
                category,
                url,
                entries,
                attempts,
            } => {
                info!(
                    "Source fetched: category={} entries={} attempts={} url={}",
                    category,
                    entries,
                    attempts,
                    UrlUtils::obfuscate_credentials(&url)
                );
            }
            PipelineEvent::SourceFailed {
                category,
                url,
                error,
                attempts,
            } => {
                warn!(
                    "Source skipped: category={} reason={} attempts={} error={}",
                    category,
                    error.kind(),
                    attempts,
                    UrlUtils::obfuscate_credentials(&error.to_string())
                );
                debug!("Skipped source url={}", UrlUtils::obfuscate_credentials(&url));
            }
            PipelineEvent::PreFiltered { parsed, eligible } => {
                info!(
                    "Pre-filter: parsed={} eligible={} excluded={}",
                    parsed,
                    eligible,
                    parsed.saturating_sub(eligible)
                );
            }
            PipelineEvent::ProbeBatchCompleted {
                batch,
                total_batches,
                probed,
                total,
                working,
            } => {
                if batch % self.progress_every_batches == 0 || batch == total_batches {
                    info!(
                        "Probe progress: batch={}/{} probed={}/{} working={}",
                        batch, total_batches, probed, total, working
                    );
                } else {
                    debug!(
                        "Probe progress: batch={}/{} probed={}/{} working={}",
                        batch, total_batches, probed, total, working
                    );
                }
            }
            PipelineEvent::BudgetExhausted { phase, abandoned } => {
                warn!(
                    "Overall budget exhausted during {}: abandoned={}",
                    phase, abandoned
                );
            }
            PipelineEvent::FilterApplied {
                stage,
                before,
                after,
            } => {
                info!(
                    "Filter {}: kept={} removed={}",
                    stage,
                    after,
                    before.saturating_sub(after)
                );
            }
            PipelineEvent::QualityReport(q) => {
                info!(
                    "Quality breakdown: uhd={} fhd={} enhanced={} unknown={}",
                    q.uhd, q.fhd, q.enhanced, q.unknown
                );
            }
            PipelineEvent::LatencyReport(l) => {
                info!(
                    "Latency breakdown: excellent={} good={} acceptable={}",
                    l.excellent, l.good, l.acceptable
                );
            }
            PipelineEvent::OutputWritten {
                path,
                channels,
                bytes,
            } => {
                info!(
                    "Playlist written: path={} channels={} size={}KB",
                    path.display(),
                    channels,
                    bytes / 1024
                );
            }
            PipelineEvent::NoOutput { reason } => {
                warn!("No playlist written: {}", reason);
            }
            PipelineEvent::RunFinished { channels, elapsed } => {
                info!(
                    "Aggregation COMPLETED: channels={} duration={}",
                    channels,
                    format_elapsed(elapsed)
                );
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Mean latency of a group, for headers and reports
pub fn mean_latency_ms(channels: &[&Channel]) -> f64 {
    if channels.is_empty() {
        return 0.0;
    }
    channels.iter().map(|c| c.latency_ms()).sum::<f64>() / channels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;
    use crate::models::{ProbeOutcome, RawEntry};
    use crate::services::classifier::ChannelClassifier;

    fn channel(name: &str, latency_ms: f64) -> Channel {
        let classifier = ChannelClassifier::new(&ClassificationConfig::default()).unwrap();
        let mut c = Channel::new(
            RawEntry {
                name: name.to_string(),
                url: format!("http://example.com/{}", name.replace(' ', "_")),
                ..Default::default()
            },
            Category::new("tv"),
            &classifier,
        )
        .unwrap();
        c.record_probe(ProbeOutcome::Working { latency_ms });
        c
    }

    #[test]
    fn test_quality_breakdown_buckets() {
        let channels = vec![
            channel("Film 4K", 100.0),
            channel("Film UHD HEVC", 100.0),
            channel("Film 1080p", 100.0),
            channel("Film HEVC", 100.0),
            channel("Film", 100.0),
        ];
        assert_eq!(
            QualityBreakdown::from_channels(&channels),
            QualityBreakdown { uhd: 2, fhd: 1, enhanced: 1, unknown: 1 }
        );
    }

    #[test]
    fn test_latency_breakdown_tiers() {
        let channels = vec![
            channel("A One", 1500.0),
            channel("B Two", 1501.0),
            channel("C Three", 2500.0),
            channel("D Four", 3300.0),
        ];
        assert_eq!(
            LatencyBreakdown::from_channels(
                &channels,
                Duration::from_millis(1500),
                Duration::from_millis(2500)
            ),
            LatencyBreakdown { excellent: 1, good: 2, acceptable: 1 }
        );
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryEventSink::new();
        sink.emit(PipelineEvent::RunStarted { sources: 2 });
        sink.emit(PipelineEvent::NoOutput { reason: "empty".to_string() });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], PipelineEvent::RunStarted { sources: 2 });
    }

    #[test]
    fn test_mean_latency() {
        let a = channel("A One", 700.0);
        let b = channel("B Two", 900.0);
        assert_eq!(mean_latency_ms(&[&a, &b]), 800.0);
        assert_eq!(mean_latency_ms(&[]), 0.0);
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingEventSink::new(0);
        sink.emit(PipelineEvent::ProbeBatchCompleted {
            batch: 1,
            total_batches: 3,
            probed: 200,
            total: 600,
            working: 40,
        });
        sink.emit(PipelineEvent::FilterApplied {
            stage: FilterStage::UrlDedup,
            before: 10,
            after: 8,
        });
    }
}
