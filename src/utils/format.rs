// zkvrm-snapshot/src/utils/format.rs

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Renders a millisecond count with the largest unit that keeps it above one,
/// e.g. `950ms`, `1.5s`, `2.0m`, `1.0h`, `3.5d`.
pub fn format_duration(duration_ms: u64) -> String {
    let ms = duration_ms as f64;
    match duration_ms {
        0..1_000 => format!("{}ms", duration_ms),
        1_000..60_000 => format!("{:.1}s", ms / 1_000.0),
        60_000..3_600_000 => format!("{:.1}m", ms / 60_000.0),
        3_600_000..86_400_000 => format!("{:.1}h", ms / 3_600_000.0),
        _ => format!("{:.1}d", ms / 86_400_000.0),
    }
}

/// Renders a byte count in binary units, `512B`, `1.5KB`, `12.0MB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{}{}", bytes, BYTE_UNITS[0])
    } else {
        format!("{:.1}{}", value, BYTE_UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_picks_unit() {
        assert_eq!(format_duration(0), "0ms");
        assert_eq!(format_duration(999), "999ms");
        assert_eq!(format_duration(1_500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
        assert_eq!(format_duration(3_600_000), "1.0h");
        assert_eq!(format_duration(2 * 86_400_000), "2.0d");
    }

    #[test]
    fn test_format_bytes_picks_unit() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1023), "1023B");
        assert_eq!(format_bytes(1536), "1.5KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0MB");
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024 * 1024), "2048.0TB");
    }
}
