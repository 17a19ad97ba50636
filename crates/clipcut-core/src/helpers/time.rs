// crates/clipcut-core/src/helpers/time.rs
//
// Time and size formatting shared by the range selector, the orchestrator log
// and the UI panels.

/// Compact clock label: `MM:SS`, or `HH:MM:SS` once the value reaches an hour.
/// Non-finite input renders as `00:00`.
///
/// ```
/// use clipcut_core::helpers::time::format_time;
/// assert_eq!(format_time(0.0),    "00:00");
/// assert_eq!(format_time(75.9),   "01:15");
/// assert_eq!(format_time(3725.0), "01:02:05");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00".into();
    }
    let s     = seconds.max(0.0) as u64;
    let hours = s / 3600;
    let mins  = (s % 3600) / 60;
    let secs  = s % 60;
    if hours > 0 {
        format!("{hours:02}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Always-`HH:MM:SS` form used by the start/end text fields.
///
/// ```
/// use clipcut_core::helpers::time::format_time_for_input;
/// assert_eq!(format_time_for_input(45.0), "00:00:45");
/// ```
pub fn format_time_for_input(seconds: f64) -> String {
    let s = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

/// Parse an `HH:MM:SS` field into seconds (`h*3600 + m*60 + s`).
/// Anything that is not exactly three integer parts, or whose total does
/// not fit in an `i64`, yields 0.
pub fn parse_time_input(text: &str) -> f64 {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 3 {
        return 0.0;
    }
    let mut total: i64 = 0;
    for (part, scale) in parts.iter().zip([3600i64, 60, 1]) {
        let Ok(v) = part.trim().parse::<i64>() else { return 0.0 };
        match v.checked_mul(scale).and_then(|x| total.checked_add(x)) {
            Some(t) => total = t,
            None    => return 0.0,
        }
    }
    total as f64
}

/// Human-readable byte count (`0 Bytes`, `1.5 KB`, `12.25 MB`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit  = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit  += 1;
    }
    // Two decimals, trailing zeros trimmed.
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_fields() {
        assert_eq!(parse_time_input("00:00:10"), 10.0);
        assert_eq!(parse_time_input("01:02:03"), 3723.0);
    }

    #[test]
    fn malformed_fields_are_zero() {
        assert_eq!(parse_time_input(""), 0.0);
        assert_eq!(parse_time_input("10"), 0.0);
        assert_eq!(parse_time_input("00:10"), 0.0);
        assert_eq!(parse_time_input("aa:bb:cc"), 0.0);
        assert_eq!(parse_time_input("00:00:00:01"), 0.0);
    }

    #[test]
    fn oversized_fields_are_zero_not_overflow() {
        assert_eq!(parse_time_input("9999999999999999:00:00"), 0.0);
        assert_eq!(parse_time_input("00:00:9223372036854775807"), 9223372036854775807i64 as f64);
        assert_eq!(parse_time_input("00:01:9223372036854775807"), 0.0);
        assert_eq!(parse_time_input("99999999999999999999:00:00"), 0.0);
    }

    #[test]
    fn input_format_truncates_fractions() {
        assert_eq!(format_time_for_input(19.9), "00:00:19");
        assert_eq!(format_time_for_input(3600.0), "01:00:00");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }
}
