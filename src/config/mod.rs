use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::utils::status_code_matcher::is_valid_pattern;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Prefix for environment overrides, nested keys split on `__`
pub const ENV_PREFIX: &str = "IPTV_AGGREGATOR_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Category label -> ordered list of playlist document URLs
    pub sources: BTreeMap<String, Vec<String>>,
    pub fetch: FetchConfig,
    pub probe: ProbeConfig,
    pub filter: FilterConfig,
    pub classification: ClassificationConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub run: RunConfig,
}

/// Source document retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total timeout for one document fetch
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Extra attempts after a non-2xx response; timeouts are never retried
    pub max_retries: u32,
    /// Fixed delay between attempts
    #[serde(with = "duration_serde::duration")]
    pub retry_backoff: Duration,
}

/// Liveness probing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Global cap on in-flight probes
    pub max_concurrent: usize,
    /// Channels dispatched per sequential batch
    pub batch_size: usize,
    /// Status patterns ("200", "3xx") that count as reachable
    pub accepted_statuses: Vec<String>,
    /// Probes slower than this are classified DEAD ("off" disables)
    #[serde(with = "duration_serde::option_duration")]
    pub max_latency: Option<Duration>,
    pub progress_log_every_batches: usize,
}

/// Final ordering of the emitted playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    /// category asc, quality desc, latency asc
    #[default]
    QualityFirst,
    /// category asc, country asc, latency asc
    CountryLatency,
}

/// Post-probe filtering and reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Latency tier applied after probing ("off" disables)
    #[serde(with = "duration_serde::option_duration")]
    pub max_latency: Option<Duration>,
    pub sort_order: SortOrder,
    #[serde(with = "duration_serde::duration")]
    pub excellent_latency: Duration,
    #[serde(with = "duration_serde::duration")]
    pub good_latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryKeyword {
    pub keyword: String,
    pub code: String,
}

/// Keyword tables used to classify channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Checked before any country keyword; a hit excludes the channel
    pub blocked_regions: Vec<String>,
    /// Ordered; the first keyword present wins
    pub countries: Vec<CountryKeyword>,
    pub uhd_tokens: Vec<String>,
    pub fhd_tokens: Vec<String>,
    pub low_quality_tokens: Vec<String>,
    pub codec_tokens: Vec<String>,
    /// Whole words removed from names when building the identity key
    pub service_tokens: Vec<String>,
}

/// Transport collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub pool_max_idle_per_host: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Title shown in the playlist header entry
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock budget for fetching and probing
    #[serde(with = "duration_serde::duration")]
    pub overall_budget: Duration,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_sources() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("tv".to_string(), strings(DEFAULT_TV_SOURCES)),
        ("movies".to_string(), strings(DEFAULT_MOVIE_SOURCES)),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            fetch: FetchConfig::default(),
            probe: ProbeConfig::default(),
            filter: FilterConfig::default(),
            classification: ClassificationConfig::default(),
            http: HttpConfig::default(),
            output: OutputConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: DEFAULT_FETCH_MAX_RETRIES,
            retry_backoff: Duration::from_secs(DEFAULT_FETCH_RETRY_BACKOFF_SECS),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            max_concurrent: DEFAULT_PROBE_MAX_CONCURRENT,
            batch_size: DEFAULT_PROBE_BATCH_SIZE,
            accepted_statuses: strings(DEFAULT_ACCEPTED_STATUSES),
            max_latency: Some(Duration::from_millis(DEFAULT_PROBE_MAX_LATENCY_MS)),
            progress_log_every_batches: DEFAULT_PROGRESS_LOG_EVERY_BATCHES,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_latency: Some(Duration::from_millis(DEFAULT_FILTER_MAX_LATENCY_MS)),
            sort_order: SortOrder::default(),
            excellent_latency: Duration::from_millis(DEFAULT_EXCELLENT_LATENCY_MS),
            good_latency: Duration::from_millis(DEFAULT_GOOD_LATENCY_MS),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            blocked_regions: strings(DEFAULT_BLOCKED_REGIONS),
            countries: DEFAULT_COUNTRIES
                .iter()
                .map(|(keyword, code)| CountryKeyword {
                    keyword: keyword.to_string(),
                    code: code.to_string(),
                })
                .collect(),
            uhd_tokens: strings(DEFAULT_UHD_TOKENS),
            fhd_tokens: strings(DEFAULT_FHD_TOKENS),
            low_quality_tokens: strings(DEFAULT_LOW_QUALITY_TOKENS),
            codec_tokens: strings(DEFAULT_CODEC_TOKENS),
            service_tokens: strings(DEFAULT_SERVICE_TOKENS),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            title: DEFAULT_OUTPUT_TITLE.to_string(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            overall_budget: Duration::from_secs(DEFAULT_OVERALL_BUDGET_SECS),
        }
    }
}

impl Config {
    /// Flattened `(category, url)` pairs in configuration order
    pub fn source_refs(&self) -> Vec<(String, String)> {
        self.sources
            .iter()
            .flat_map(|(category, urls)| {
                urls.iter()
                    .map(move |url| (category.clone(), url.trim().to_string()))
            })
            .filter(|(_, url)| !url.is_empty())
            .collect()
    }

    /// Reject settings that would stall or invert the pipeline
    pub fn validate(&self) -> AppResult<()> {
        if self.probe.max_concurrent == 0 {
            return Err(AppError::configuration("probe.max_concurrent must be greater than 0"));
        }
        if self.probe.batch_size == 0 {
            return Err(AppError::configuration("probe.batch_size must be greater than 0"));
        }
        if self.probe.accepted_statuses.is_empty() {
            return Err(AppError::configuration("probe.accepted_statuses must not be empty"));
        }
        if let Some(bad) = self
            .probe
            .accepted_statuses
            .iter()
            .find(|pattern| !is_valid_pattern(pattern))
        {
            return Err(AppError::configuration(format!(
                "probe.accepted_statuses contains invalid pattern '{bad}'"
            )));
        }
        if self.filter.excellent_latency > self.filter.good_latency {
            return Err(AppError::configuration(
                "filter.excellent_latency must not exceed filter.good_latency",
            ));
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(AppError::configuration("output.path must not be empty"));
        }
        Ok(())
    }

    /// Layer a TOML file and `IPTV_AGGREGATOR_*` environment variables over the defaults.
    ///
    /// A missing file is created from the defaults first.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let config_file = config_file.as_ref();
        if !config_file.exists() {
            let contents = toml::to_string_pretty(&Self::default()).map_err(|e| {
                AppError::configuration(format!("Failed to render default config: {e}"))
            })?;
            std::fs::write(config_file, contents).map_err(|e| AppError::output(config_file, e))?;
            info!("Created default config file: {}", config_file.display());
        }

        let config: Config = Figment::new()
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe.max_concurrent, 150);
        assert_eq!(config.probe.batch_size, 200);
        assert_eq!(config.fetch.max_retries, 1);
        assert_eq!(config.filter.sort_order, SortOrder::QualityFirst);
    }

    #[test]
    fn test_default_sources_cover_both_categories() {
        let config = Config::default();
        let refs = config.source_refs();
        assert!(refs.iter().any(|(category, _)| category == "tv"));
        assert!(refs.iter().any(|(category, _)| category == "movies"));
        assert_eq!(
            refs.len(),
            DEFAULT_TV_SOURCES.len() + DEFAULT_MOVIE_SOURCES.len()
        );
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.probe.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_status_pattern() {
        let mut config = Config::default();
        config.probe.accepted_statuses = vec!["2xx".to_string(), "ok".to_string()];
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_latency_tiers() {
        let mut config = Config::default();
        config.filter.excellent_latency = Duration::from_secs(5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [sources]
            news = ["https://example.com/news.m3u"]

            [probe]
            max_concurrent = 10
            max_latency = "off"

            [filter]
            sort_order = "country_latency"
        "#;
        let config: Config = Figment::new()
            .merge(Toml::string(text))
            .extract()
            .unwrap();
        assert_eq!(config.probe.max_concurrent, 10);
        assert_eq!(config.probe.batch_size, DEFAULT_PROBE_BATCH_SIZE);
        assert_eq!(config.probe.max_latency, None);
        assert_eq!(config.filter.sort_order, SortOrder::CountryLatency);
        assert_eq!(
            config.source_refs(),
            vec![("news".to_string(), "https://example.com/news.m3u".to_string())]
        );
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = Figment::new()
            .merge(Toml::string(&text))
            .extract()
            .unwrap();
        assert_eq!(config.classification, ClassificationConfig::default());
        assert_eq!(config.probe.max_latency, Some(Duration::from_millis(3400)));
        assert_eq!(config.run.overall_budget, Duration::from_secs(DEFAULT_OVERALL_BUDGET_SECS));
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.output.path, PathBuf::from(DEFAULT_OUTPUT_PATH));
    }
}
