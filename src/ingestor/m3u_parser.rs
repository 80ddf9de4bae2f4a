//! Playlist document parsing
//!
//! Turns the text of one `#EXTM3U` style document into [`RawEntry`] values.
//! Malformed entries are skipped; only a document without any `#EXTINF`
//! marker is an error.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::trace;

use crate::errors::PlaylistError;
use crate::models::{ATTR_TVG_ID, ATTR_TVG_NAME, RawEntry};
use crate::utils::url::UrlUtils;

pub const ENTRY_MARKER: &str = "#EXTINF";

/// Lines after a marker searched for its URL
pub const URL_LOOKAHEAD_LINES: usize = 4;

static EXTINF_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#EXTINF(?::\s*-?\d+(?:\.\d+)?)?\s*").expect("static regex")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w-]+)=(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

/// A normalized playlist document. [`entries`](Self::entries) can be
/// called any number of times.
#[derive(Debug, Clone)]
pub struct PlaylistDocument {
    lines: Vec<String>,
}

impl PlaylistDocument {
    pub fn parse(text: &str) -> Result<Self, PlaylistError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if !text.contains(ENTRY_MARKER) {
            return Err(PlaylistError::NoEntryMarkers);
        }
        let lines = text
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .split('\n')
            .map(|line| line.trim().to_string())
            .collect();
        Ok(Self { lines })
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries {
            lines: &self.lines,
            next: 0,
        }
    }
}

/// Iterator over the accepted entries of a [`PlaylistDocument`]
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    lines: &'a [String],
    next: usize,
}

impl Iterator for Entries<'_> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        let lines = self.lines;
        while self.next < lines.len() {
            let line = lines[self.next].as_str();
            self.next += 1;
            if !line.starts_with(ENTRY_MARKER) {
                continue;
            }

            let Some(url) = self.take_url_line() else {
                trace!("No URL line for entry '{}'", line);
                continue;
            };
            if !UrlUtils::has_http_scheme(url) {
                trace!("Skipping non-HTTP entry URL '{}'", url);
                continue;
            }
            if let Some(entry) = parse_entry(line, url)
                && entry.is_acceptable()
            {
                return Some(entry);
            }
        }
        None
    }
}

impl<'a> Entries<'a> {
    /// First non-blank, non-comment line within the lookahead window.
    /// Another marker ends the search and is left for the next entry.
    fn take_url_line(&mut self) -> Option<&'a str> {
        let lines = self.lines;
        let end = (self.next + URL_LOOKAHEAD_LINES).min(lines.len());
        while self.next < end {
            let candidate = lines[self.next].as_str();
            if candidate.starts_with(ENTRY_MARKER) {
                return None;
            }
            self.next += 1;
            if candidate.is_empty() || candidate.starts_with('#') {
                continue;
            }
            return Some(candidate);
        }
        None
    }
}

/// Split a metadata line into attributes and display name
fn parse_entry(metadata: &str, url: &str) -> Option<RawEntry> {
    let body = EXTINF_PREFIX.replace(metadata, "");
    let (attribute_part, name_part) = body.rsplit_once(',').unwrap_or((&*body, ""));

    let attributes: HashMap<String, String> = ATTRIBUTE
        .captures_iter(attribute_part)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((key, value))
        })
        .collect();

    let mut name = ATTRIBUTE.replace_all(name_part, "").trim().to_string();
    if name.is_empty() {
        name = [ATTR_TVG_NAME, ATTR_TVG_ID]
            .iter()
            .find_map(|key| attributes.get(*key).filter(|v| !v.trim().is_empty()))
            .map(|v| v.trim().to_string())?;
    }

    Some(RawEntry {
        name,
        url: url.to_string(),
        attributes,
    })
}
