//! Pipeline orchestrator - drives one aggregation run end to end
//!
//! fetch all sources -> build channels -> pre-filter -> probe in batches ->
//! filter, dedupe and sort -> render -> publish.
//!
//! The whole fetch and probe phase shares one wall-clock budget. Work still
//! pending when it runs out is abandoned: unfinished sources contribute
//! nothing and unprobed channels stay `UNCHECKED`, so the liveness filter
//! drops them.

use chrono::Utc;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::{Channel, ProbeStatus};
use crate::observability::{
    EventSink, LatencyBreakdown, PipelineEvent, QualityBreakdown, RunPhase,
};
use crate::pipeline::stages::filtering::{FilteringStage, StageCount};
use crate::pipeline::stages::{PlaylistRenderer, PublishContentStage};
use crate::services::{ChannelClassifier, LivenessProber};
use crate::sources::{SourceFetcher, SourceRef};
use crate::utils::http_client::HttpTransport;

/// Counts collected along one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub sources_total: usize,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    /// Sources still pending when the budget ran out
    pub sources_abandoned: usize,
    /// Channels built from all fetched entries
    pub parsed: usize,
    /// Channels left after the pre-probe eligibility gate
    pub eligible: usize,
    pub probed: usize,
    pub working: usize,
    pub budget_exhausted: bool,
    pub stages: Vec<StageCount>,
    pub final_channels: usize,
    pub quality: QualityBreakdown,
    pub latency: LatencyBreakdown,
}

/// Outcome of [`AggregationPipeline::run`]
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Set only when a document was written
    pub output: Option<PathBuf>,
    pub channels: usize,
    pub elapsed: Duration,
    pub stats: RunStats,
}

pub struct AggregationPipeline {
    config: Config,
    classifier: ChannelClassifier,
    fetcher: SourceFetcher,
    prober: LivenessProber,
    filtering: FilteringStage,
    renderer: PlaylistRenderer,
    publisher: PublishContentStage,
    sink: Arc<dyn EventSink>,
}

impl AggregationPipeline {
    pub fn new(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn EventSink>,
    ) -> AppResult<Self> {
        config.validate()?;
        let classifier = ChannelClassifier::new(&config.classification)?;
        let fetcher = SourceFetcher::new(transport.clone(), config.fetch.clone(), sink.clone());
        let prober = LivenessProber::new(transport, &config.probe);
        let filtering = FilteringStage::new(config.filter.max_latency, config.filter.sort_order);
        let renderer = PlaylistRenderer::new(config.output.title.clone());
        let publisher = PublishContentStage::new(config.output.path.clone());

        Ok(Self {
            config,
            classifier,
            fetcher,
            prober,
            filtering,
            renderer,
            publisher,
            sink,
        })
    }

    /// Fetch, probe and reduce. Returns the final channels in emission order.
    pub async fn collect(&self) -> (Vec<Channel>, RunStats) {
        let deadline = tokio::time::Instant::now() + self.config.run.overall_budget;
        let mut stats = RunStats::default();

        let sources: Vec<SourceRef> = self
            .config
            .source_refs()
            .into_iter()
            .map(|(category, url)| SourceRef::new(category, url))
            .collect();
        stats.sources_total = sources.len();
        self.sink.emit(PipelineEvent::RunStarted {
            sources: sources.len(),
        });

        let mut arena = self.fetch_all(sources, deadline, &mut stats).await;

        stats.parsed = arena.len();
        // Same predicate the eligibility filter applies again after probing
        arena.retain(Channel::is_eligible);
        stats.eligible = arena.len();
        self.sink.emit(PipelineEvent::PreFiltered {
            parsed: stats.parsed,
            eligible: stats.eligible,
        });

        self.probe_all(&mut arena, deadline, &mut stats).await;

        let (positions, stage_counts) = self.filtering.process(&arena, self.sink.as_ref());
        stats.stages = stage_counts;

        let mut slots: Vec<Option<Channel>> = arena.into_iter().map(Some).collect();
        let channels: Vec<Channel> = positions
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();

        stats.final_channels = channels.len();
        stats.quality = QualityBreakdown::from_channels(&channels);
        stats.latency = LatencyBreakdown::from_channels(
            &channels,
            self.config.filter.excellent_latency,
            self.config.filter.good_latency,
        );
        if !channels.is_empty() {
            self.sink.emit(PipelineEvent::QualityReport(stats.quality));
            self.sink.emit(PipelineEvent::LatencyReport(stats.latency));
        }
        (channels, stats)
    }

    /// Full run: collect, then render and publish when anything survived.
    ///
    /// Only an output write failure is an error.
    pub async fn run(&self) -> AppResult<RunSummary> {
        let started = Instant::now();
        let (channels, stats) = self.collect().await;

        let output = if channels.is_empty() {
            self.sink.emit(PipelineEvent::NoOutput {
                reason: "no channels passed all filters".to_string(),
            });
            None
        } else {
            let document = self.renderer.render(&channels, Utc::now());
            let bytes = self.publisher.publish(&document).await?;
            self.sink.emit(PipelineEvent::OutputWritten {
                path: self.publisher.target().to_path_buf(),
                channels: channels.len(),
                bytes,
            });
            Some(self.publisher.target().to_path_buf())
        };

        let elapsed = started.elapsed();
        self.sink.emit(PipelineEvent::RunFinished {
            channels: channels.len(),
            elapsed,
        });
        Ok(RunSummary {
            output,
            channels: channels.len(),
            elapsed,
            stats,
        })
    }

    async fn fetch_all(
        &self,
        sources: Vec<SourceRef>,
        deadline: tokio::time::Instant,
        stats: &mut RunStats,
    ) -> Vec<Channel> {
        let fetches = sources.into_iter().map(|source| async move {
            timeout_at(deadline, self.fetcher.fetch(source)).await.ok()
        });
        let outcomes = join_all(fetches).await;

        let mut arena = Vec::new();
        for outcome in outcomes {
            let Some(outcome) = outcome else {
                stats.sources_abandoned += 1;
                continue;
            };
            if outcome.result.is_ok() {
                stats.sources_succeeded += 1;
            } else {
                stats.sources_failed += 1;
            }
            let category = outcome.source.category.clone();
            arena.extend(
                outcome
                    .into_entries()
                    .into_iter()
                    .filter_map(|raw| Channel::new(raw, category.clone(), &self.classifier)),
            );
        }

        if stats.sources_abandoned > 0 {
            stats.budget_exhausted = true;
            self.sink.emit(PipelineEvent::BudgetExhausted {
                phase: RunPhase::Fetch,
                abandoned: stats.sources_abandoned,
            });
        }
        info!(
            "Fetch phase done: succeeded={} failed={} abandoned={} channels={}",
            stats.sources_succeeded,
            stats.sources_failed,
            stats.sources_abandoned,
            arena.len()
        );
        arena
    }

    async fn probe_all(
        &self,
        arena: &mut [Channel],
        deadline: tokio::time::Instant,
        stats: &mut RunStats,
    ) {
        let total = arena.len();
        let batch_size = self.config.probe.batch_size.max(1);
        let total_batches = total.div_ceil(batch_size);

        for (index, batch) in arena.chunks_mut(batch_size).enumerate() {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            let finished = timeout_at(deadline, self.prober.probe_all(batch)).await.is_ok();

            // Probes that completed before an expiry have already recorded
            stats.probed += batch
                .iter()
                .filter(|c| c.probe_status() != ProbeStatus::Unchecked)
                .count();
            stats.working += batch.iter().filter(|c| c.is_working()).count();
            self.sink.emit(PipelineEvent::ProbeBatchCompleted {
                batch: index + 1,
                total_batches,
                probed: stats.probed,
                total,
                working: stats.working,
            });

            if !finished {
                break;
            }
        }

        if stats.probed < total {
            stats.budget_exhausted = true;
            self.sink.emit(PipelineEvent::BudgetExhausted {
                phase: RunPhase::Probe,
                abandoned: total - stats.probed,
            });
        }
        debug!("Probe phase done: probed={} working={}", stats.probed, stats.working);
    }
}
