//! Filtering stage - reduces the probed channel arena to the emitted set
//!
//! Each step is a total filter over positions into the arena: liveness,
//! eligibility, latency tier, URL dedup, identity dedup, then the final
//! sort. Nothing removed by an earlier step is ever reintroduced.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;
use tracing::debug;

use crate::config::SortOrder;
use crate::models::{Category, Channel, CountryTag};
use crate::observability::{EventSink, FilterStage, PipelineEvent};

/// Surviving count after one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCount {
    pub stage: FilterStage,
    pub before: usize,
    pub after: usize,
}

pub fn liveness(arena: &[Channel], candidates: Vec<usize>) -> Vec<usize> {
    candidates.into_iter().filter(|&i| arena[i].is_working()).collect()
}

/// Pure and idempotent; also applied before probing
pub fn eligibility(arena: &[Channel], candidates: Vec<usize>) -> Vec<usize> {
    candidates
        .into_iter()
        .filter(|&i| arena[i].is_eligible())
        .collect()
}

pub fn latency(
    arena: &[Channel],
    candidates: Vec<usize>,
    max_latency: Option<Duration>,
) -> Vec<usize> {
    let Some(max) = max_latency else {
        return candidates;
    };
    let max_ms = max.as_micros() as f64 / 1000.0;
    candidates
        .into_iter()
        .filter(|&i| arena[i].latency_ms() <= max_ms)
        .collect()
}

/// One survivor per identity hash: the lowest latency, first seen on ties
pub fn dedupe_by_url(arena: &[Channel], candidates: Vec<usize>) -> Vec<usize> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(candidates.len());
    let mut survivors: Vec<usize> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.entry(arena[candidate].identity_hash()) {
            Entry::Vacant(vacant) => {
                vacant.insert(survivors.len());
                survivors.push(candidate);
            }
            Entry::Occupied(occupied) => {
                let slot = *occupied.get();
                if arena[candidate].latency_ms() < arena[survivors[slot]].latency_ms() {
                    survivors[slot] = candidate;
                }
            }
        }
    }
    survivors
}

/// Composite "same logical channel" key
fn identity_key(channel: &Channel) -> (&str, &CountryTag, &Category) {
    (channel.normalized_key(), channel.country(), channel.category())
}

/// Whether `candidate` should replace the current group survivor
fn outranks(candidate: &Channel, survivor: &Channel) -> bool {
    match candidate.quality_score().cmp(&survivor.quality_score()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.latency_ms() < survivor.latency_ms(),
    }
}

/// One survivor per identity key: higher quality, then lower latency,
/// then input order
pub fn dedupe_by_identity(arena: &[Channel], candidates: Vec<usize>) -> Vec<usize> {
    let mut slots: HashMap<(&str, &CountryTag, &Category), usize> =
        HashMap::with_capacity(candidates.len());
    let mut survivors: Vec<usize> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.entry(identity_key(&arena[candidate])) {
            Entry::Vacant(vacant) => {
                vacant.insert(survivors.len());
                survivors.push(candidate);
            }
            Entry::Occupied(occupied) => {
                let slot = *occupied.get();
                if outranks(&arena[candidate], &arena[survivors[slot]]) {
                    survivors[slot] = candidate;
                }
            }
        }
    }
    survivors
}

/// Total order over arena positions; the position breaks any remaining tie
pub fn sort(arena: &[Channel], candidates: &mut [usize], order: SortOrder) {
    candidates.sort_by(|&a, &b| {
        let (x, y) = (&arena[a], &arena[b]);
        let primary = x.category().cmp(y.category());
        let secondary = match order {
            SortOrder::QualityFirst => y
                .quality_score()
                .cmp(&x.quality_score())
                .then_with(|| x.latency_ms().total_cmp(&y.latency_ms())),
            SortOrder::CountryLatency => x
                .country()
                .as_str()
                .cmp(y.country().as_str())
                .then_with(|| x.latency_ms().total_cmp(&y.latency_ms())),
        };
        primary.then(secondary).then_with(|| a.cmp(&b))
    });
}

/// Runs every post-probe step in order and reports each one
pub struct FilteringStage {
    max_latency: Option<Duration>,
    sort_order: SortOrder,
}

impl FilteringStage {
    pub fn new(max_latency: Option<Duration>, sort_order: SortOrder) -> Self {
        Self {
            max_latency,
            sort_order,
        }
    }

    pub fn process(
        &self,
        arena: &[Channel],
        sink: &dyn EventSink,
    ) -> (Vec<usize>, Vec<StageCount>) {
        let mut counts = Vec::with_capacity(5);
        let mut record = |stage: FilterStage, before: usize, after: usize| {
            sink.emit(PipelineEvent::FilterApplied { stage, before, after });
            counts.push(StageCount { stage, before, after });
        };

        let all: Vec<usize> = (0..arena.len()).collect();
        let before = all.len();
        let live = liveness(arena, all);
        record(FilterStage::Liveness, before, live.len());

        let before = live.len();
        let eligible = eligibility(arena, live);
        record(FilterStage::Eligibility, before, eligible.len());

        let before = eligible.len();
        let fast = latency(arena, eligible, self.max_latency);
        record(FilterStage::Latency, before, fast.len());

        let before = fast.len();
        let unique_urls = dedupe_by_url(arena, fast);
        record(FilterStage::UrlDedup, before, unique_urls.len());

        let before = unique_urls.len();
        let mut survivors = dedupe_by_identity(arena, unique_urls);
        record(FilterStage::IdentityDedup, before, survivors.len());

        sort(arena, &mut survivors, self.sort_order);
        debug!("Filtering complete: survivors={} order={}", survivors.len(), self.sort_order);
        (survivors, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;
    use crate::models::{ProbeOutcome, RawEntry};
    use crate::observability::MemoryEventSink;
    use crate::services::classifier::ChannelClassifier;

    fn probed(name: &str, url: &str, group: &str, category: &str, latency: Option<f64>) -> Channel {
        let classifier = ChannelClassifier::new(&ClassificationConfig::default()).unwrap();
        let mut attributes = std::collections::HashMap::new();
        if !group.is_empty() {
            attributes.insert("group-title".to_string(), group.to_string());
        }
        let mut channel = Channel::new(
            RawEntry {
                name: name.to_string(),
                url: url.to_string(),
                attributes,
            },
            Category::new(category),
            &classifier,
        )
        .unwrap();
        channel.record_probe(match latency {
            Some(latency_ms) => ProbeOutcome::Working { latency_ms },
            None => ProbeOutcome::Dead,
        });
        channel
    }

    fn names(arena: &[Channel], positions: &[usize]) -> Vec<String> {
        positions.iter().map(|&i| arena[i].display_name().to_string()).collect()
    }

    #[test]
    fn test_liveness_and_latency_tier() {
        let arena = vec![
            probed("Alpha", "http://example.com/a", "", "tv", Some(100.0)),
            probed("Bravo", "http://example.com/b", "", "tv", None),
            probed("Charlie", "http://example.com/c", "", "tv", Some(3400.0)),
            probed("Delta", "http://example.com/d", "", "tv", Some(3400.5)),
        ];
        let live = liveness(&arena, (0..arena.len()).collect());
        assert_eq!(live, vec![0, 2, 3]);
        assert_eq!(latency(&arena, live.clone(), Some(Duration::from_millis(3400))), vec![0, 2]);
        assert_eq!(latency(&arena, live, None), vec![0, 2, 3]);
    }

    #[test]
    fn test_eligibility_is_idempotent() {
        let arena = vec![
            probed("News HD", "http://example.com/a", "USA", "tv", Some(800.0)),
            probed("News 1080p", "http://example.com/b", "USA", "tv", Some(1200.0)),
            probed("Star Gold", "http://example.com/c", "India", "tv", Some(100.0)),
        ];
        let once = eligibility(&arena, (0..arena.len()).collect());
        let twice = eligibility(&arena, once.clone());
        assert_eq!(once, vec![1]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_url_dedup_keeps_fastest_first_on_ties() {
        let arena = vec![
            probed("Mirror One", "http://example.com/same", "", "tv", Some(900.0)),
            probed("Mirror Two", "http://example.com/same", "", "tv", Some(400.0)),
            probed("Mirror Three", "http://example.com/same", "", "tv", Some(400.0)),
            probed("Other", "http://example.com/other", "", "tv", Some(50.0)),
        ];
        let survivors = dedupe_by_url(&arena, (0..arena.len()).collect());
        assert_eq!(names(&arena, &survivors), vec!["Mirror Two", "Other"]);
    }

    #[test]
    fn test_identity_dedup_prefers_lower_latency_at_equal_quality() {
        let arena = vec![
            probed("Sports 1080p", "http://example.com/s1", "USA", "tv", Some(900.0)),
            probed("Sports FHD", "http://example.com/s2", "USA", "tv", Some(700.0)),
        ];
        let survivors = dedupe_by_identity(&arena, vec![0, 1]);
        assert_eq!(survivors, vec![1]);
    }

    #[test]
    fn test_identity_dedup_prefers_quality_over_latency() {
        let arena = vec![
            probed("Cinema", "http://example.com/c1", "", "movies", Some(100.0)),
            probed("Cinema 4K", "http://example.com/c2", "", "movies", Some(2000.0)),
            probed("Cinema 1080p", "http://example.com/c3", "", "movies", Some(50.0)),
        ];
        let survivors = dedupe_by_identity(&arena, vec![0, 1, 2]);
        assert_eq!(names(&arena, &survivors), vec!["Cinema 4K"]);
        assert_eq!(dedupe_by_identity(&arena, survivors.clone()), survivors);
    }

    #[test]
    fn test_identity_dedup_separates_country_and_category() {
        let arena = vec![
            probed("News", "http://example.com/n1", "USA", "tv", Some(100.0)),
            probed("News", "http://example.com/n2", "UK", "tv", Some(100.0)),
            probed("News", "http://example.com/n3", "USA", "movies", Some(100.0)),
        ];
        let survivors = dedupe_by_identity(&arena, (0..arena.len()).collect());
        assert_eq!(survivors, vec![0, 1, 2]);
        assert_eq!(dedupe_by_identity(&arena, survivors.clone()), survivors);
    }

    #[test]
    fn test_identity_dedup_ignores_punctuation() {
        let arena = vec![
            probed("ESPN-2", "http://example.com/e1", "", "tv", Some(600.0)),
            probed("ESPN2", "http://example.com/e2", "", "tv", Some(400.0)),
        ];
        let survivors = dedupe_by_identity(&arena, vec![0, 1]);
        assert_eq!(names(&arena, &survivors), vec!["ESPN2"]);
    }

    #[test]
    fn test_identity_dedup_groups_empty_keys_together() {
        let arena = vec![
            probed("Live TV", "http://example.com/l1", "", "tv", Some(300.0)),
            probed("TV Channel", "http://example.com/l2", "", "tv", Some(200.0)),
            probed("Live", "http://example.com/l3", "", "movies", Some(900.0)),
        ];
        assert_eq!(arena[0].normalized_key(), "");
        assert_eq!(arena[1].normalized_key(), "");
        let survivors = dedupe_by_identity(&arena, (0..arena.len()).collect());
        assert_eq!(names(&arena, &survivors), vec!["TV Channel", "Live"]);
    }

    #[test]
    fn test_sort_orders() {
        let arena = vec![
            probed("Zulu 1080p", "http://example.com/z", "UK", "tv", Some(300.0)),
            probed("Yankee 4K", "http://example.com/y", "USA", "tv", Some(900.0)),
            probed("Xray", "http://example.com/x", "UK", "movies", Some(100.0)),
            probed("Whiskey 1080p", "http://example.com/w", "USA", "tv", Some(200.0)),
        ];
        let mut positions: Vec<usize> = (0..arena.len()).collect();
        sort(&arena, &mut positions, SortOrder::QualityFirst);
        assert_eq!(
            names(&arena, &positions),
            vec!["Xray", "Yankee 4K", "Whiskey 1080p", "Zulu 1080p"]
        );

        sort(&arena, &mut positions, SortOrder::CountryLatency);
        assert_eq!(
            names(&arena, &positions),
            vec!["Xray", "Zulu 1080p", "Whiskey 1080p", "Yankee 4K"]
        );
    }

    #[test]
    fn test_stage_reports_every_step() {
        let arena = vec![
            probed("News HD", "http://example.com/a", "USA", "tv", Some(800.0)),
            probed("News 1080p", "http://example.com/b", "USA", "tv", Some(1200.0)),
            probed("Dead One", "http://example.com/c", "", "tv", None),
        ];
        let sink = MemoryEventSink::new();
        let stage = FilteringStage::new(Some(Duration::from_millis(3400)), SortOrder::QualityFirst);

        let (survivors, counts) = stage.process(&arena, &sink);
        assert_eq!(names(&arena, &survivors), vec!["News 1080p"]);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0], StageCount { stage: FilterStage::Liveness, before: 3, after: 2 });
        assert_eq!(counts[1], StageCount { stage: FilterStage::Eligibility, before: 2, after: 1 });
        assert_eq!(sink.events().len(), 5);
    }
}
