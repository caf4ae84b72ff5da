//! Runtime settings. The binary fills these from flags and `COUNTRY_RATES_*` variables.

use crate::api::{DEFAULT_COUNTRIES_URL, DEFAULT_RATES_URL};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Address the HTTP server listens on.
    pub bind: String,
    pub database_path: PathBuf,
    /// Where the summary PNG is cached; overwritten on every successful refresh.
    pub cache_path: PathBuf,
    pub countries_url: String,
    pub rates_url: String,
    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
    /// TrueType font for the summary image. When unset, well-known system paths are searched.
    pub font_path: Option<PathBuf>,
    /// Seed for the GDP multiplier; random when unset.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            database_path: PathBuf::from("countries.db"),
            cache_path: PathBuf::from("cache").join("summary.png"),
            countries_url: DEFAULT_COUNTRIES_URL.into(),
            rates_url: DEFAULT_RATES_URL.into(),
            timeout_secs: 600,
            font_path: None,
            seed: None,
        }
    }
}
