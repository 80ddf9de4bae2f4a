//! Static channel classification
//!
//! Everything here is a pure function of channel text: name cleaning,
//! identity keys, region tags and quality scores. Keyword tables come from
//! [`ClassificationConfig`] and are compiled once into case-insensitive
//! whole-word regexes.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::config::ClassificationConfig;
use crate::errors::{AppError, AppResult};
use crate::models::CountryTag;

pub const BASE_QUALITY_SCORE: u8 = 50;
pub const UHD_QUALITY_SCORE: u8 = 100;
pub const FHD_QUALITY_SCORE: u8 = 80;
pub const CODEC_BONUS: u8 = 15;
pub const MAX_QUALITY_SCORE: u8 = 115;

pub const MAX_DISPLAY_NAME_CHARS: usize = 80;
pub const MAX_TVG_ID_CHARS: usize = 40;

static DISALLOWED_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-+.()\[\]&]").expect("static regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static NON_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("static regex"));

/// Compiled keyword tables
#[derive(Debug, Clone)]
pub struct ChannelClassifier {
    blocked: Option<Regex>,
    countries: Vec<(Regex, String)>,
    uhd: Option<Regex>,
    fhd: Option<Regex>,
    low_quality: Option<Regex>,
    codec: Option<Regex>,
    service: Option<Regex>,
}

fn word_pattern(token: &str) -> String {
    let starts_word = token.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
    let ends_word = token.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_');
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(token),
        if ends_word { r"\b" } else { "" }
    )
}

/// One alternation over every token; longest first so phrases mask whole
fn compile_tokens(table: &str, tokens: &[String]) -> AppResult<Option<Regex>> {
    let mut cleaned: Vec<String> = tokens
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    cleaned.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    cleaned.dedup();

    let pattern = cleaned
        .iter()
        .map(|t| word_pattern(t))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!("(?:{pattern})"))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| AppError::configuration(format!("Invalid classification.{table} entry: {e}")))
}

fn matches(regex: &Option<Regex>, text: &str) -> bool {
    regex.as_ref().is_some_and(|r| r.is_match(text))
}

impl ChannelClassifier {
    pub fn new(config: &ClassificationConfig) -> AppResult<Self> {
        let countries = config
            .countries
            .iter()
            .filter(|entry| !entry.keyword.trim().is_empty())
            .map(|entry| {
                RegexBuilder::new(&word_pattern(&entry.keyword.trim().to_lowercase()))
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (regex, entry.code.clone()))
                    .map_err(|e| {
                        AppError::configuration(format!(
                            "Invalid classification.countries entry: {e}"
                        ))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            blocked: compile_tokens("blocked_regions", &config.blocked_regions)?,
            countries,
            uhd: compile_tokens("uhd_tokens", &config.uhd_tokens)?,
            fhd: compile_tokens("fhd_tokens", &config.fhd_tokens)?,
            low_quality: compile_tokens("low_quality_tokens", &config.low_quality_tokens)?,
            codec: compile_tokens("codec_tokens", &config.codec_tokens)?,
            service: compile_tokens("service_tokens", &config.service_tokens)?,
        })
    }

    /// Allow-listed characters only, single spaces, at most 80 characters
    pub fn clean_name(&self, name: &str) -> String {
        let stripped = DISALLOWED_NAME_CHARS.replace_all(name, "");
        let collapsed = WHITESPACE_RUN.replace_all(stripped.trim(), " ");
        collapsed.chars().take(MAX_DISPLAY_NAME_CHARS).collect::<String>().trim_end().to_string()
    }

    /// Case, punctuation and service-token folded name
    pub fn normalize_key(&self, name: &str) -> String {
        let lowered = name.to_lowercase();
        let without_punctuation = PUNCTUATION.replace_all(&lowered, "");
        let without_tokens = match &self.service {
            Some(service) => service.replace_all(&without_punctuation, " ").into_owned(),
            None => without_punctuation.into_owned(),
        };
        WHITESPACE_RUN.replace_all(without_tokens.trim(), " ").into_owned()
    }

    /// Blocked regions first, then the ordered country table
    pub fn classify_country(&self, group_title: &str, name: &str) -> CountryTag {
        let group = group_title.to_lowercase();
        let name = name.to_lowercase();
        let hit = |regex: &Regex| regex.is_match(&group) || regex.is_match(&name);

        if self.blocked.as_ref().is_some_and(hit) {
            return CountryTag::Blocked;
        }
        self.countries
            .iter()
            .find(|(regex, _)| hit(regex))
            .map(|(_, code)| CountryTag::Code(code.clone()))
            .unwrap_or(CountryTag::International)
    }

    /// Score in `0..=115`; zero marks a disqualified channel.
    ///
    /// High-quality matches are masked before the low-quality check so the
    /// `hd` inside `full hd` is not counted against the channel. The codec
    /// bonus never lifts a disqualified channel.
    pub fn score_quality(&self, name: &str, group_title: &str) -> u8 {
        let text = format!("{name} {group_title}").to_lowercase();

        let mut score = if matches(&self.uhd, &text) {
            UHD_QUALITY_SCORE
        } else if matches(&self.fhd, &text) {
            FHD_QUALITY_SCORE
        } else {
            BASE_QUALITY_SCORE
        };

        let mut masked = text.clone();
        for high in [&self.uhd, &self.fhd].into_iter().flatten() {
            masked = high.replace_all(&masked, " ").into_owned();
        }
        if matches(&self.low_quality, &masked) {
            score = 0;
        }

        if score > 0 && matches(&self.codec, &text) {
            score = score.saturating_add(CODEC_BONUS);
        }
        score.min(MAX_QUALITY_SCORE)
    }

    /// Fallback `tvg-id` derived from the display name
    pub fn default_tvg_id(&self, display_name: &str) -> String {
        NON_ID_CHARS
            .replace_all(&display_name.to_lowercase(), "-")
            .chars()
            .take(MAX_TVG_ID_CHARS)
            .collect()
    }
}
