//! Subcommand implementations for the `dialer` binary

pub mod dispose;
pub mod lead;
pub mod queue;
pub mod reconcile;
pub mod schedule;
pub mod stats;

use chrono::{DateTime, Utc};

/// First 8 characters of a lead id
pub(crate) fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}

/// `MM-DD HH:MM` in UTC, or `-`
pub(crate) fn short_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Cut to `max` characters with a trailing ellipsis
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Acme Roofing", 20), "Acme Roofing");
        assert_eq!(truncate("Acme Roofing and Gutters", 10), "Acme Ro...");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_ts(None), "-");
    }
}
