use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::{
    ATTR_GROUP_TITLE, ATTR_TVG_ID, ATTR_TVG_NAME, Category, CountryTag, ProbeOutcome, ProbeStatus,
    RawEntry,
};
use crate::services::classifier::ChannelClassifier;

/// Hex characters kept from the URL digest
pub const IDENTITY_HASH_LEN: usize = 16;

/// Canonical record for one playlist entry.
///
/// Everything except the probe result is fixed at construction.
#[derive(Debug, Clone)]
pub struct Channel {
    display_name: String,
    normalized_key: String,
    url: String,
    identity_hash: String,
    attributes: HashMap<String, String>,
    category: Category,
    country: CountryTag,
    quality_score: u8,
    probe_status: ProbeStatus,
    latency_ms: f64,
}

pub fn identity_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(IDENTITY_HASH_LEN);
    hash
}

impl Channel {
    /// Build a channel, or `None` when the entry is too short to keep
    pub fn new(raw: RawEntry, category: Category, classifier: &ChannelClassifier) -> Option<Self> {
        if !raw.is_acceptable() {
            return None;
        }
        let display_name = classifier.clean_name(&raw.name);
        if display_name.is_empty() {
            return None;
        }

        let group_title = raw.attribute(ATTR_GROUP_TITLE).unwrap_or_default().to_string();
        let url = raw.url.trim().to_string();
        let RawEntry { mut attributes, .. } = raw;

        let country = classifier.classify_country(&group_title, &display_name);
        let normalized_key = classifier.normalize_key(&display_name);

        attributes
            .entry(ATTR_TVG_ID.to_string())
            .or_insert_with(|| classifier.default_tvg_id(&display_name));
        attributes
            .entry(ATTR_TVG_NAME.to_string())
            .or_insert_with(|| display_name.clone());
        // Quality sees the group-title as emitted, so a missing group falls
        // back to the category heading. Country only uses the source's group.
        let emitted_group = attributes
            .entry(ATTR_GROUP_TITLE.to_string())
            .or_insert_with(|| category.heading());
        let quality_score = classifier.score_quality(&display_name, emitted_group.as_str());

        Some(Self {
            identity_hash: identity_hash(&url),
            display_name,
            normalized_key,
            url,
            attributes,
            category,
            country,
            quality_score,
            probe_status: ProbeStatus::Unchecked,
            latency_ms: f64::INFINITY,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn normalized_key(&self) -> &str {
        &self.normalized_key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn identity_hash(&self) -> &str {
        &self.identity_hash
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn country(&self) -> &CountryTag {
        &self.country
    }

    pub fn quality_score(&self) -> u8 {
        self.quality_score
    }

    pub fn probe_status(&self) -> ProbeStatus {
        self.probe_status
    }

    /// Measured latency; infinite unless the channel is `WORKING`
    pub fn latency_ms(&self) -> f64 {
        self.latency_ms
    }

    pub fn is_working(&self) -> bool {
        self.probe_status == ProbeStatus::Working
    }

    /// Static policy gate: disqualified quality or a blocked region never ships
    pub fn is_eligible(&self) -> bool {
        self.quality_score > 0 && !self.country.is_blocked()
    }

    /// Apply a probe result. Only the first call has any effect.
    pub fn record_probe(&mut self, outcome: ProbeOutcome) -> bool {
        if self.probe_status != ProbeStatus::Unchecked {
            return false;
        }
        match outcome {
            ProbeOutcome::Working { latency_ms } => {
                self.probe_status = ProbeStatus::Working;
                self.latency_ms = latency_ms;
            }
            ProbeOutcome::Dead => self.probe_status = ProbeStatus::Dead,
        }
        true
    }
}
