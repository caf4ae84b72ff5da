//! Number and timestamp formatting for the summary image.

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};

/// Format a GDP value with comma thousands separators and two decimals, e.g. `1,234,567.89`.
pub fn format_gdp(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let cents = (value.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as u64;
    let frac = (cents % 100.0) as u64;
    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{sign}{}.{frac:02}", whole.to_formatted_string(&Locale::en))
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
