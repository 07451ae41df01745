//! # Validation
//!
//! Parsing for `spec.resyncInterval` duration strings.

use anyhow::Result;
use regex::Regex;
use std::time::Duration;

/// Parse a Kubernetes duration string into a `std::time::Duration`.
/// Supports formats: "30s", "1m", "5m", "1h", "2h", "1d".
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    // Matches: <number><unit> where unit is s, m, h, or d (case insensitive)
    let duration_regex = Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();

    let captures = duration_regex.captures(&interval_lower).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '30s', '5m', '1h')",
            duration_trimmed
        )
    })?;

    let number: u64 = captures["number"].parse().map_err(|e| {
        anyhow::anyhow!("Invalid duration number in '{}': {}", duration_trimmed, e)
    })?;

    if number == 0 {
        return Err(anyhow::anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let seconds = match &captures["unit"] {
        "s" => number,
        "m" => number * 60,
        "h" => number * 3600,
        "d" => number * 86400,
        unit => {
            return Err(anyhow::anyhow!(
                "Invalid unit '{}' in duration '{}'. Expected: s, m, h, or d",
                unit,
                duration_trimmed
            ));
        }
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_minutes_hours_days() {
        assert_eq!(
            parse_kubernetes_duration("30s").expect("valid"),
            Duration::from_secs(30)
        );
        assert_eq!(
            parse_kubernetes_duration("5m").expect("valid"),
            Duration::from_secs(300)
        );
        assert_eq!(
            parse_kubernetes_duration("2h").expect("valid"),
            Duration::from_secs(7200)
        );
        assert_eq!(
            parse_kubernetes_duration("1d").expect("valid"),
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn trims_whitespace_and_ignores_case() {
        assert_eq!(
            parse_kubernetes_duration(" 5M ").expect("valid"),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert!(parse_kubernetes_duration("").is_err());
        assert!(parse_kubernetes_duration("abc").is_err());
        assert!(parse_kubernetes_duration("5x").is_err());
        assert!(parse_kubernetes_duration("1h30m").is_err());
        assert!(parse_kubernetes_duration("0s").is_err());
    }
}
