// zkvrm-snapshot/src/config/duration.rs
use regex::Regex;
use std::sync::LazyLock;

static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(ms|s|m|h|d)?$").expect("duration pattern is valid"));

/// Parses interval strings such as `"5m"`, `"30s"` or a bare millisecond
/// count into milliseconds.
///
/// Accepted units are `ms` (the default when no suffix is given), `s`, `m`,
/// `h` and `d`, case-insensitive and with surrounding whitespace ignored.
/// Returns `None` for anything else, including negative values and amounts
/// that would overflow a `u64`.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let normalised = raw.trim().to_lowercase();
    let captures = DURATION_PATTERN.captures(&normalised)?;

    let amount: u64 = captures.get(1)?.as_str().parse().ok()?;
    let multiplier = match captures.get(2).map(|unit| unit.as_str()) {
        None | Some("ms") => 1,
        Some("s") => 1_000,
        Some("m") => 60_000,
        Some("h") => 3_600_000,
        Some("d") => 86_400_000,
        Some(_) => return None,
    };

    amount.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250"), Some(250));
        assert_eq!(parse_duration("250ms"), Some(250));
        assert_eq!(parse_duration("30s"), Some(30_000));
        assert_eq!(parse_duration("5m"), Some(300_000));
        assert_eq!(parse_duration("2h"), Some(7_200_000));
        assert_eq!(parse_duration("1d"), Some(86_400_000));
    }

    #[test]
    fn test_parse_duration_trims_and_ignores_case() {
        assert_eq!(parse_duration("  15M "), Some(900_000));
        assert_eq!(parse_duration("10MS"), Some(10));
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        for raw in ["", "   ", "abc", "-5m", "5w", "m", "1.5h", "5 m", "10sec"] {
            assert_eq!(parse_duration(raw), None, "expected {:?} to be rejected", raw);
        }
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("99999999999999999999"), None);
        assert_eq!(parse_duration(&format!("{}d", u64::MAX / 1_000)), None);
    }
}
