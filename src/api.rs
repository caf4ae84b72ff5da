//! Synchronous clients for the two upstream sources:
//! the **REST Countries API (v2)** and the **open exchange-rate API (v6)**.
//!
//! ### Notes
//! - Upstreams can be slow; the default timeout is long (10 minutes) and configurable.
//! - No retries: a failed fetch fails the refresh that issued it.
//! - Country entries that are not objects parse as empty descriptors so the refresh
//!   pipeline counts them as skipped, like missing names or zero population.
//! - A payload without a single object entry is treated as unusable.
//!
//! Typical usage:
//! ```no_run
//! # use country_rates::api::{Client, CountrySource, RateSource};
//! let client = Client::default();
//! let countries = client.fetch_countries()?;
//! let rates = client.fetch_rates()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
use crate::config::Settings;
use crate::models::{RatesResponse, SourceCountry};
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Source of raw country descriptors.
pub trait CountrySource: Send + Sync {
    fn fetch_countries(&self) -> Result<Vec<SourceCountry>>;
}

/// Source of the currency code → USD rate mapping.
pub trait RateSource: Send + Sync {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub countries_url: String,
    pub rates_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(
            DEFAULT_COUNTRIES_URL,
            DEFAULT_RATES_URL,
            Duration::from_secs(600),
        )
        .expect("reqwest client build")
    }
}

impl Client {
    /// Build a client against explicit endpoints.
    pub fn new(
        countries_url: impl Into<String>,
        rates_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout) // total request timeout
            .connect_timeout(timeout)
            .redirect(Policy::limited(5))
            .user_agent(concat!("country_rates/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            countries_url: countries_url.into(),
            rates_url: rates_url.into(),
            http,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.countries_url.clone(),
            settings.rates_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.http.get(url).send().context("send request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("request failed with HTTP {}", status);
        }
        resp.json().context("decode json")
    }
}

/// Parse the countries payload: a top-level array of descriptor objects.
///
/// Non-object entries become empty descriptors; at least one object entry is required.
pub fn parse_countries(v: Value) -> Result<Vec<SourceCountry>> {
    let Value::Array(items) = v else {
        bail!("unexpected response shape: not a top-level array");
    };
    if items.is_empty() {
        bail!("unexpected response: empty country list");
    }
    let objects = items.iter().filter(|item| item.is_object()).count();
    if objects == 0 {
        bail!("unexpected response: no country objects among {} entries", items.len());
    }
    if objects < items.len() {
        log::debug!("{} country entries are not objects", items.len() - objects);
    }
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

/// Parse the exchange-rate payload into a code → rate map.
pub fn parse_rates(v: Value) -> Result<HashMap<String, f64>> {
    let resp: RatesResponse = serde_json::from_value(v).context("parse rates")?;
    if resp.result.as_deref() == Some("error") {
        bail!("exchange rate api reported an error");
    }
    if resp.rates.is_empty() {
        bail!("unexpected response: empty rates");
    }
    Ok(resp.rates)
}

impl CountrySource for Client {
    fn fetch_countries(&self) -> Result<Vec<SourceCountry>> {
        let url = &self.countries_url;
        let v = self.get_json(url).with_context(|| format!("GET {}", url))?;
        let countries = parse_countries(v).with_context(|| format!("GET {}", url))?;
        log::info!("fetched {} country descriptors", countries.len());
        Ok(countries)
    }
}

impl RateSource for Client {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        let url = &self.rates_url;
        let v = self.get_json(url).with_context(|| format!("GET {}", url))?;
        let rates = parse_rates(v).with_context(|| format!("GET {}", url))?;
        log::info!("fetched {} exchange rates", rates.len());
        Ok(rates)
    }
}
