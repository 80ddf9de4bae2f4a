use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumString};

pub mod channel;

pub use channel::Channel;

/// Attribute keys every emitted channel carries
pub const ATTR_TVG_ID: &str = "tvg-id";
pub const ATTR_TVG_NAME: &str = "tvg-name";
pub const ATTR_GROUP_TITLE: &str = "group-title";

/// One `#EXTINF` entry as found in a source document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    pub name: String,
    pub url: String,
    pub attributes: HashMap<String, String>,
}

impl RawEntry {
    pub const MIN_NAME_CHARS: usize = 2;
    pub const MIN_URL_CHARS: usize = 10;

    /// Entries with a too-short name or URL never become channels
    pub fn is_acceptable(&self) -> bool {
        self.name.trim().chars().count() >= Self::MIN_NAME_CHARS
            && self.url.trim().chars().count() >= Self::MIN_URL_CHARS
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Caller-supplied partition label ("tv", "movies", ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label as shown in group titles and group headers
    pub fn heading(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Region classification derived from name and group text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CountryTag {
    Code(String),
    International,
    Blocked,
}

impl CountryTag {
    pub fn as_str(&self) -> &str {
        match self {
            CountryTag::Code(code) => code,
            CountryTag::International => "INT",
            CountryTag::Blocked => "BLOCKED",
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, CountryTag::Blocked)
    }
}

impl fmt::Display for CountryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    #[default]
    Unchecked,
    Working,
    Dead,
}

/// What a single liveness probe concluded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    Working { latency_ms: f64 },
    Dead,
}
