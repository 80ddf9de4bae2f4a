//! HTTP Status Code Matching Utilities
//!
//! Provides utilities for matching HTTP status codes against patterns,
//! supporting wildcard patterns like "2xx", "3xx", etc.

/// Check if a status code matches any of the acceptable status code patterns
pub fn is_status_acceptable(status_code: u16, acceptable_codes: &[String]) -> bool {
    acceptable_codes
        .iter()
        .any(|pattern| matches_pattern(status_code, pattern))
}

/// Whether a pattern is an exact code ("206") or a class wildcard ("3xx")
pub fn is_valid_pattern(pattern: &str) -> bool {
    let pattern = pattern.trim();
    if let Some(prefix) = pattern.strip_suffix("xx") {
        return prefix.len() == 1 && matches!(prefix.as_bytes()[0], b'1'..=b'5');
    }
    pattern.len() == 3 && pattern.parse::<u16>().is_ok_and(|code| (100..=599).contains(&code))
}

/// Check if a status code matches a specific pattern
fn matches_pattern(status_code: u16, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if let Some(prefix) = pattern.strip_suffix("xx") {
        // Handle wildcard patterns like "2xx", "4xx"
        if prefix.len() == 1 {
            if let Ok(prefix_digit) = prefix.parse::<u16>() {
                return status_code / 100 == prefix_digit;
            }
        }
        false
    } else {
        // Handle exact matches like "206", "200"
        pattern
            .parse::<u16>()
            .is_ok_and(|exact_code| status_code == exact_code)
    }
}
