#![allow(dead_code)] // Each test binary uses a different subset of these helpers.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use country_rates::CountryService;
use country_rates::api::{CountrySource, RateSource, parse_countries};
use country_rates::models::{CountryDraft, CountryRecord, SourceCountry, TopEntry};
use country_rates::refresh::{Multiplier, Refresher};
use country_rates::storage::{CountryStore, SqliteStore, StoreError};
use country_rates::viz::{RenderError, SummaryRenderer};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Countries upstream returning a fixed JSON payload; the payload can be swapped between runs.
#[derive(Clone)]
pub struct StaticCountries(pub Arc<Mutex<Value>>);

impl StaticCountries {
    pub fn new(v: Value) -> Self {
        Self(Arc::new(Mutex::new(v)))
    }

    pub fn set(&self, v: Value) {
        *self.0.lock().unwrap() = v;
    }
}

impl CountrySource for StaticCountries {
    fn fetch_countries(&self) -> Result<Vec<SourceCountry>> {
        parse_countries(self.0.lock().unwrap().clone())
    }
}

pub struct StaticRates(pub HashMap<String, f64>);

impl StaticRates {
    pub fn new(rates: &[(&str, f64)]) -> Self {
        Self(rates.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }
}

impl RateSource for StaticRates {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        Ok(self.0.clone())
    }
}

/// Upstream that is always down.
pub struct Unreachable;

impl CountrySource for Unreachable {
    fn fetch_countries(&self) -> Result<Vec<SourceCountry>> {
        Err(anyhow!("connection refused"))
    }
}

impl RateSource for Unreachable {
    fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        Err(anyhow!("connection refused"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub total: usize,
    pub top: Vec<TopEntry>,
}

/// Renderer that records its inputs and returns fixed bytes.
#[derive(Clone, Default)]
pub struct RecordingRenderer(pub Arc<Mutex<Vec<RenderCall>>>);

impl SummaryRenderer for RecordingRenderer {
    fn render(
        &self,
        total: usize,
        top: &[TopEntry],
        _rendered_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, RenderError> {
        self.0.lock().unwrap().push(RenderCall {
            total,
            top: top.to_vec(),
        });
        Ok(FAKE_PNG.to_vec())
    }
}

/// Store wrapper that refuses writes for one name.
pub struct RejectingStore {
    pub inner: SqliteStore,
    pub reject: String,
}

impl CountryStore for RejectingStore {
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        self.inner.find_by_name(name)
    }

    fn upsert(
        &self,
        draft: &CountryDraft,
        now: DateTime<Utc>,
    ) -> Result<CountryRecord, StoreError> {
        if draft.name.eq_ignore_ascii_case(&self.reject) {
            return Err(StoreError::Poisoned);
        }
        self.inner.upsert(draft, now)
    }

    fn all(&self) -> Result<Vec<CountryRecord>, StoreError> {
        self.inner.all()
    }

    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.delete_by_name(name)
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.inner.count()
    }
}

pub struct Harness {
    pub service: CountryService,
    pub store: Arc<dyn CountryStore>,
    pub countries: StaticCountries,
    pub renders: RecordingRenderer,
    pub cache_path: PathBuf,
    _dir: TempDir,
}

pub fn harness_with(
    countries: Value,
    rates: Box<dyn RateSource>,
    store: Arc<dyn CountryStore>,
    multiplier: Multiplier,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache").join("summary.png");
    let countries = StaticCountries::new(countries);
    let renders = RecordingRenderer::default();
    let refresher = Refresher::new(
        Box::new(countries.clone()),
        rates,
        Box::new(renders.clone()),
        multiplier,
        cache_path.clone(),
    );
    Harness {
        service: CountryService::new(store.clone(), refresher),
        store,
        countries,
        renders,
        cache_path,
        _dir: dir,
    }
}

pub fn harness(countries: Value, rates: &[(&str, f64)]) -> Harness {
    harness_with(
        countries,
        Box::new(StaticRates::new(rates)),
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        Multiplier::fixed(1500.0),
    )
}

pub fn country(name: &str, region: &str, population: u64, code: &str) -> Value {
    json!({
        "name": name,
        "capital": format!("{name} City"),
        "region": region,
        "population": population,
        "flag": format!("https://flags.example/{}.svg", code.to_lowercase()),
        "currencies": [{ "code": code, "name": "Money", "symbol": "$" }],
        "independent": false
    })
}

/// Three valid countries: two with known rates, one without.
pub fn three_countries() -> (Value, Vec<(&'static str, f64)>) {
    (
        json!([
            country("Nigeria", "Africa", 206_139_589, "NGN"),
            country("Ghana", "Africa", 31_072_940, "GHS"),
            country("Tuvalu", "Oceania", 11_792, "TVD"),
        ]),
        vec![("NGN", 1600.23), ("GHS", 15.34), ("EUR", 0.92)],
    )
}

pub fn record(id: i64, name: &str, region: Option<&str>, code: &str, gdp: Option<f64>) -> CountryRecord {
    CountryRecord {
        id,
        name: name.into(),
        capital: None,
        region: region.map(Into::into),
        population: 1_000,
        currency_code: code.into(),
        exchange_rate: gdp.map(|_| 1.0),
        estimated_gdp: gdp,
        flag_url: None,
        last_refreshed_at: Utc::now(),
    }
}
