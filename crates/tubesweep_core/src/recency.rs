//! Relative-time phrases ("3 days ago", "Streamed 2 weeks ago") to day counts.
//!
//! Months are 30 days and years 365. The value only gates a coarse
//! continue/stop decision, so calendar accuracy is not needed.

use std::sync::LazyLock;

use regex::Regex;

struct Unit {
    pattern: Regex,
    /// `None` means "counts as one day whatever the number".
    days_per: Option<u64>,
}

static UNITS: LazyLock<Vec<Unit>> = LazyLock::new(|| {
    let unit = |pattern: &str, days_per: Option<u64>| Unit {
        pattern: Regex::new(pattern).expect("static recency pattern"),
        days_per,
    };
    vec![
        unit(r"(?i)(\d+)\s+(second|minute|hour|now)", None),
        unit(r"(?i)(\d+)\s+day", Some(1)),
        unit(r"(?i)(\d+)\s+week", Some(7)),
        unit(r"(?i)(\d+)\s+month", Some(30)),
        unit(r"(?i)(\d+)\s+year", Some(365)),
    ]
});

/// Parses the first recognised phrase in `text` into a day count.
/// Unrecognised text yields 0, meaning "unknown".
pub fn recency_days(text: &str) -> u64 {
    for unit in UNITS.iter() {
        let Some(captures) = unit.pattern.captures(text) else {
            continue;
        };
        let Some(days_per) = unit.days_per else {
            return 1;
        };
        return captures
            .get(1)
            .and_then(|count| count.as_str().parse::<u64>().ok())
            .map(|count| count.saturating_mul(days_per))
            .unwrap_or(0);
    }
    0
}
