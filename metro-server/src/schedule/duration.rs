//! Line duration calculation.

use tracing::debug;

/// Parse a frequency text such as `"10 min"` into minutes.
///
/// Every non-digit character is stripped and the remainder parsed. Empty or
/// unparsable remainders fall back to `default_mins`; this is the only
/// validation failure the core recovers from locally.
///
/// # Examples
///
/// ```
/// use metro_server::schedule::parse_frequency;
///
/// assert_eq!(parse_frequency(Some("10 min"), 10), 10);
/// assert_eq!(parse_frequency(Some("every 4"), 10), 4);
/// assert_eq!(parse_frequency(Some("often"), 10), 10);
/// assert_eq!(parse_frequency(None, 7), 7);
/// ```
pub fn parse_frequency(text: Option<&str>, default_mins: u32) -> u32 {
    let Some(text) = text else {
        return default_mins;
    };
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.parse() {
        Ok(mins) => mins,
        Err(_) => {
            debug!(frequency = %text, default_mins, "Unparsable frequency, using default");
            default_mins
        }
    }
}

/// Total traversal time of a line in minutes.
///
/// `(station_count - 1) * frequency` for two or more stations, else zero.
pub fn compute_total_duration(station_count: usize, frequency_text: Option<&str>, default_mins: u32) -> u32 {
    if station_count < 2 {
        return 0;
    }
    let frequency = parse_frequency(frequency_text, default_mins);
    let hops = u32::try_from(station_count - 1).unwrap_or(u32::MAX);
    hops.saturating_mul(frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parsing() {
        assert_eq!(parse_frequency(Some("10"), 10), 10);
        assert_eq!(parse_frequency(Some("10 min"), 10), 10);
        assert_eq!(parse_frequency(Some(" 1 5 "), 10), 15);
        assert_eq!(parse_frequency(Some("0"), 10), 0);
        assert_eq!(parse_frequency(Some(""), 10), 10);
        assert_eq!(parse_frequency(Some("fast"), 10), 10);
        assert_eq!(parse_frequency(Some("99999999999"), 10), 10);
    }

    #[test]
    fn duration_scenarios() {
        assert_eq!(compute_total_duration(3, Some("10 min"), 10), 20);
        assert_eq!(compute_total_duration(5, Some("4"), 10), 16);
        assert_eq!(compute_total_duration(4, None, 10), 30);
        assert_eq!(compute_total_duration(1, Some("10"), 10), 0);
        assert_eq!(compute_total_duration(0, Some("10"), 10), 0);
    }
}
