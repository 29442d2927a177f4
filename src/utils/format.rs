use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Format a unix timestamp as `D-M-YYYY, HH:MM:SS (UTC)`, the display
/// format the dashboard always used
pub fn timestamp_to_utc_string(unix_timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(unix_timestamp, 0) {
        Some(dt) => dt.format("%-d-%-m-%Y, %H:%M:%S (UTC)").to_string(),
        None => format!("invalid timestamp {}", unix_timestamp),
    }
}

/// Render elapsed seconds as `HH:MM:SS` (hours grow past two digits)
pub fn elapsed_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// "last contact" line: absolute UTC time plus how long ago that was
pub fn last_contact_string(status_time: i64, now: i64) -> String {
    format!(
        "{} ({} ago)",
        timestamp_to_utc_string(status_time),
        elapsed_hms(now - status_time)
    )
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// {"key1": "value1", "key2": "value2"} -> "key1:value1, key2:value2"
pub fn map_to_display(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Substitute a placeholder for values a sensor never reported
pub fn optional_display<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "x".to_string(),
    }
}
