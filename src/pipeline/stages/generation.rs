//! Generation stage - renders the final channel sequence as an M3U document

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::models::{ATTR_GROUP_TITLE, ATTR_TVG_ID, ATTR_TVG_NAME, Category, Channel};
use crate::observability::mean_latency_ms;
use crate::utils::human_format::format_latency_ms;

/// Attributes written per channel, in this order
const RENDERED_ATTRIBUTES: [&str; 3] = [ATTR_TVG_ID, ATTR_TVG_NAME, ATTR_GROUP_TITLE];

pub struct PlaylistRenderer {
    title: String,
}

impl PlaylistRenderer {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self { title: title.into() }
    }

    /// Render channels already in emission order. No filtering or reordering.
    pub fn render(&self, channels: &[Channel], generated_at: DateTime<Utc>) -> String {
        let mut lines: Vec<String> = vec![
            "#EXTM3U".to_string(),
            format!(
                "#EXTINF:-1,{} - Updated: {}",
                self.title,
                generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
            format!("#EXTINF:-1,Total: {} channels", channels.len()),
            String::new(),
        ];

        for (category, members) in group_by_category(channels) {
            lines.push(format!(
                "#EXTINF:-1,━━━ {} ({} channels, avg {}) ━━━",
                category.heading(),
                members.len(),
                format_latency_ms(mean_latency_ms(&members))
            ));
            lines.push(String::new());

            for channel in members {
                lines.push(render_entry(channel));
                lines.push(channel.url().to_string());
                lines.push(String::new());
            }
        }

        let mut document = lines.join("\n");
        document.push('\n');
        document
    }
}

/// Categories in first-encounter order, members in input order
fn group_by_category(channels: &[Channel]) -> Vec<(&Category, Vec<&Channel>)> {
    let mut groups: Vec<(&Category, Vec<&Channel>)> = Vec::new();
    for channel in channels {
        match groups.iter_mut().find(|(category, _)| *category == channel.category()) {
            Some((_, members)) => members.push(channel),
            None => groups.push((channel.category(), vec![channel])),
        }
    }
    groups
}

fn render_entry(channel: &Channel) -> String {
    let mut line = String::from("#EXTINF:-1");
    for key in RENDERED_ATTRIBUTES {
        if let Some(value) = channel.attribute(key).filter(|v| !v.is_empty()) {
            let _ = write!(line, " {}=\"{}\"", key, value.replace('"', "'"));
        }
    }
    line.push(',');
    line.push_str(channel.display_name());
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;
    use crate::ingestor::PlaylistDocument;
    use crate::models::{ProbeOutcome, RawEntry};
    use crate::services::classifier::ChannelClassifier;
    use chrono::TimeZone;

    fn channel(
        name: &str,
        url: &str,
        category: &str,
        attrs: &[(&str, &str)],
        latency_ms: f64,
    ) -> Channel {
        let classifier = ChannelClassifier::new(&ClassificationConfig::default()).unwrap();
        let mut c = Channel::new(
            RawEntry {
                name: name.to_string(),
                url: url.to_string(),
                attributes: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            Category::new(category),
            &classifier,
        )
        .unwrap();
        c.record_probe(ProbeOutcome::Working { latency_ms });
        c
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap()
    }

    #[test]
    fn test_render_layout() {
        let channels = vec![
            channel("Cinema 4K", "http://example.com/c", "movies", &[("tvg-id", "cin")], 300.0),
            channel("CNN", "http://example.com/cnn", "tv", &[("group-title", "USA")], 400.0),
            channel("BBC One", "http://example.com/bbc", "tv", &[], 600.0),
        ];
        let rendered =
            PlaylistRenderer::new("Optimized Playlist").render(&channels, generated_at());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXTINF:-1,Optimized Playlist - Updated: 2024-03-09 07:05 UTC");
        assert_eq!(lines[2], "#EXTINF:-1,Total: 3 channels");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "#EXTINF:-1,━━━ MOVIES (1 channels, avg 300ms) ━━━");
        assert_eq!(
            lines[6],
            "#EXTINF:-1 tvg-id=\"cin\" tvg-name=\"Cinema 4K\" group-title=\"MOVIES\",Cinema 4K"
        );
        assert_eq!(lines[7], "http://example.com/c");
        assert_eq!(lines[9], "#EXTINF:-1,━━━ TV (2 channels, avg 500ms) ━━━");
        assert_eq!(
            lines[11],
            "#EXTINF:-1 tvg-id=\"cnn\" tvg-name=\"CNN\" group-title=\"USA\",CNN"
        );
        assert!(rendered.ends_with("http://example.com/bbc\n\n"));
    }

    #[test]
    fn test_empty_and_quoted_attributes() {
        let channels = vec![channel(
            "Quote Test",
            "http://example.com/q",
            "tv",
            &[("tvg-id", ""), ("tvg-name", "Say \"Hi\"")],
            100.0,
        )];
        let rendered = PlaylistRenderer::new("T").render(&channels, generated_at());
        assert!(
            rendered.contains("#EXTINF:-1 tvg-name=\"Say 'Hi'\" group-title=\"TV\",Quote Test\n")
        );
    }

    #[test]
    fn test_render_round_trips_through_parser() {
        let channels = vec![
            channel("Cinema 4K", "http://example.com/c", "movies", &[], 300.0),
            channel(
                "News 1080p",
                "https://example.com/n?token=1",
                "tv",
                &[("group-title", "News, Weather")],
                400.0,
            ),
            channel("Sport (East) & More", "http://example.com/s", "tv", &[], 600.0),
        ];
        let rendered =
            PlaylistRenderer::new("Optimized Playlist").render(&channels, generated_at());

        let reparsed: Vec<RawEntry> =
            PlaylistDocument::parse(&rendered).unwrap().entries().collect();
        assert_eq!(reparsed.len(), channels.len());
        for (entry, channel) in reparsed.iter().zip(&channels) {
            assert_eq!(entry.name, channel.display_name());
            assert_eq!(entry.url, channel.url());
            for key in RENDERED_ATTRIBUTES {
                assert_eq!(entry.attribute(key), channel.attribute(key));
            }
        }
    }
}
