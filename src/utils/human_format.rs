//! Compact human-readable renderings for run logs

use std::time::Duration;

/// `850ms`, `4.25s`, `12.3s`, `2m5s`, `1h1m`
pub fn format_duration(millis: u64) -> String {
    match millis {
        0..1_000 => format!("{millis}ms"),
        1_000..10_000 => format!("{:.2}s", millis as f64 / 1000.0),
        10_000..60_000 => format!("{:.1}s", millis as f64 / 1000.0),
        _ => {
            let secs = millis / 1000;
            let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
            let mut out = String::new();
            if hours > 0 {
                out.push_str(&format!("{hours}h"));
            }
            if minutes > 0 {
                out.push_str(&format!("{minutes}m"));
            }
            if seconds > 0 {
                out.push_str(&format!("{seconds}s"));
            }
            out
        }
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format_duration(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Rounded milliseconds, `inf` when never measured
pub fn format_latency_ms(latency_ms: f64) -> String {
    if latency_ms.is_finite() {
        format!("{latency_ms:.0}ms")
    } else {
        "inf".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0ms")]
    #[case(999, "999ms")]
    #[case(1_500, "1.50s")]
    #[case(12_300, "12.3s")]
    #[case(120_000, "2m")]
    #[case(125_000, "2m5s")]
    #[case(3_600_000, "1h")]
    #[case(3_660_000, "1h1m")]
    #[case(3_601_000, "1h1s")]
    fn test_format_duration(#[case] millis: u64, #[case] expected: &str) {
        assert_eq!(format_duration(millis), expected);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1m30s");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency_ms(812.4), "812ms");
        assert_eq!(format_latency_ms(f64::INFINITY), "inf");
    }
}
