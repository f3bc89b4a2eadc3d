//! Parsing and formatting of metric values

use chrono::{DateTime, Utc};

const TIME_SUFFIXES: [&str; 5] = ["ns", "µs", "us", "ms", "s"];

/// Leading integer of a `"<millis>::<Unit>"` timestamp, 0 when malformed
pub fn parse_timestamp(timestamp: &str) -> i64 {
    let head = timestamp.split("::").next().unwrap_or_default().trim();
    let end = head
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(head.len());
    head[..end].parse().unwrap_or(0)
}

/// `1750049996844::Millisecond` -> `2025-06-16 04:59:56.844`
pub fn format_timestamp(timestamp: &str) -> String {
    DateTime::<Utc>::from_timestamp_millis(parse_timestamp(timestamp))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Whether a string looks like a duration (`12ns`, `3.5ms`, `1s`, ...)
pub fn is_duration(value: &str) -> bool {
    TIME_SUFFIXES.iter().any(|s| value.ends_with(s))
}

/// Duration string to nanoseconds. Unparsable input yields 0.
pub fn parse_duration_nanos(value: &str) -> f64 {
    let Some(number) = leading_float(value) else {
        return 0.0;
    };

    if value.ends_with("ns") {
        number
    } else if value.ends_with("µs") || value.ends_with("us") {
        number * 1_000.0
    } else if value.ends_with("ms") {
        number * 1_000_000.0
    } else if value.ends_with('s') {
        number * 1_000_000_000.0
    } else {
        number
    }
}

/// Longest numeric prefix of `s`, like a lenient float parse
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();

    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => {
                // Only an exponent when digits follow
                let rest = &bytes[end + 1..];
                let digits_at = match rest.first() {
                    Some(b'+') | Some(b'-') => 1,
                    _ => 0,
                };
                if !rest.get(digits_at).map(|b| b.is_ascii_digit()).unwrap_or(false) {
                    break;
                }
                seen_exp = true;
            }
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return None;
    }
    s[..end].parse().ok()
}

/// Nanoseconds with the largest unit that keeps the value above 1
pub fn format_nanos(ns: f64) -> String {
    if ns < 1_000.0 {
        format!("{:.0}ns", ns)
    } else if ns < 1_000_000.0 {
        format!("{:.3}µs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.3}ms", ns / 1_000_000.0)
    } else {
        format!("{:.3}s", ns / 1_000_000_000.0)
    }
}

/// Bytes with a binary unit and one decimal
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}

/// First 8 characters of a file id
pub fn shorten_file_id(file_id: &str) -> String {
    let short: String = file_id.chars().take(8).collect();
    format!("{}...", short)
}

/// `prepare_scan_cost` -> `Prepare Scan Cost`
pub fn format_field_name(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1750049996844::Millisecond"), 1750049996844);
        assert_eq!(parse_timestamp("42"), 42);
        assert_eq!(parse_timestamp("garbage"), 0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("1750049996844::Millisecond"),
            "2025-06-16 04:59:56.844"
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_nanos("0ns"), 0.0);
        assert!((parse_duration_nanos("272.571µs") - 272_571.0).abs() < 1e-6);
        assert!((parse_duration_nanos("1.5ms") - 1_500_000.0).abs() < 1e-6);
        assert!((parse_duration_nanos("2s") - 2e9).abs() < 1e-6);
        assert!((parse_duration_nanos("3us") - 3_000.0).abs() < 1e-6);
        assert_eq!(parse_duration_nanos("fast"), 0.0);
        assert_eq!(parse_duration_nanos("17"), 17.0);
    }

    #[test]
    fn test_format_nanos() {
        assert_eq!(format_nanos(999.0), "999ns");
        assert_eq!(format_nanos(275_236.0), "275.236µs");
        assert_eq!(format_nanos(1_500_000.0), "1.500ms");
        assert_eq!(format_nanos(2e9), "2.000s");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(69_146_519), "65.9 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120.0 GB");
    }

    #[test]
    fn test_names() {
        assert_eq!(shorten_file_id("fb5e2e46-3ec7-49b0"), "fb5e2e46...");
        assert_eq!(format_field_name("prepare_scan_cost"), "Prepare Scan Cost");
        assert_eq!(format_field_name("num_rows"), "Num Rows");
    }
}
