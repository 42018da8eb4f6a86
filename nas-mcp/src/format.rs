//! Text helpers shared by the tool renderers

const BYTE_UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];

/// Binary units with one decimal: `1536` -> `1.5 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in BYTE_UNITS {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PiB")
}

/// `{days}d {hours}h {minutes}m`
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

/// First `max` characters, with `...` appended when something was cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Render a JSON scalar without quotes; compound values stay JSON.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(17_179_869_184), "16.0 GiB");
        assert_eq!(format_bytes(5_497_558_138_880), "5.0 TiB");
        assert_eq!(format_bytes(1u64 << 50), "1.0 PiB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(864_000.0), "10d 0h 0m");
        assert_eq!(format_uptime(90_061.9), "1d 1h 1m");
        assert_eq!(format_uptime(-5.0), "0d 0h 0m");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééé", 2), "éé...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("localhost")), "localhost");
        assert_eq!(display_value(&json!(80)), "80");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
