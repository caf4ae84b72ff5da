//! The refresh pipeline: fetch → merge → validate → upsert → snapshot → render → cache.
//!
//! A run fetches both upstreams before touching the store, so an upstream failure leaves
//! stored records and the cached image untouched. Per-descriptor problems never fail a
//! run; they are counted in the returned [`RefreshReport`].

use crate::api::{CountrySource, RateSource};
use crate::error::{Error, Result};
use crate::models::{CountryDraft, RefreshReport, SourceCountry};
use crate::stats;
use crate::storage::{self, CountryStore};
use crate::viz::SummaryRenderer;
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Lower bound (inclusive) of the random GDP multiplier.
pub const MULTIPLIER_MIN: f64 = 1000.0;
/// Upper bound (exclusive) of the random GDP multiplier.
pub const MULTIPLIER_MAX: f64 = 2000.0;

/// Source of the per-country multiplier used in `population * U / rate`.
#[derive(Debug, Clone)]
pub enum Multiplier {
    /// Uniform on `[MULTIPLIER_MIN, MULTIPLIER_MAX)`.
    Uniform(ChaCha8Rng),
    /// Always the same value.
    Fixed(f64),
}

impl Multiplier {
    /// Entropy-seeded uniform draws.
    pub fn random() -> Self {
        Self::Uniform(ChaCha8Rng::from_entropy())
    }

    /// Reproducible uniform draws.
    pub fn seeded(seed: u64) -> Self {
        Self::Uniform(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn fixed(value: f64) -> Self {
        Self::Fixed(value)
    }

    pub fn next_value(&mut self) -> f64 {
        match self {
            Self::Uniform(rng) => rng.gen_range(MULTIPLIER_MIN..MULTIPLIER_MAX),
            Self::Fixed(v) => *v,
        }
    }
}

/// Merge one descriptor with the rate map. `None` means the descriptor is skipped.
pub fn enrich(
    country: &SourceCountry,
    rates: &HashMap<String, f64>,
    multiplier: &mut Multiplier,
) -> Option<CountryDraft> {
    let name = country
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())?;
    let population = country.population.filter(|p| *p > 0)?;
    let currency_code = country.primary_currency_code()?;

    // A rate that cannot produce a finite GDP counts as unknown.
    let (exchange_rate, estimated_gdp) = rates
        .get(currency_code)
        .copied()
        .filter(|r| r.is_finite() && *r > 0.0)
        .and_then(|rate| {
            let gdp = population as f64 * multiplier.next_value() / rate;
            gdp.is_finite().then_some((rate, gdp))
        })
        .unzip();

    Some(CountryDraft {
        name: name.to_string(),
        capital: country.capital.clone(),
        region: country.region.clone(),
        population,
        currency_code: currency_code.to_string(),
        exchange_rate,
        estimated_gdp,
        flag_url: country.flag.clone(),
    })
}

/// Runs refreshes against injected sources, renderer, and random source.
///
/// Runs are serialized: a second caller waits for the running refresh to finish.
pub struct Refresher {
    countries: Box<dyn CountrySource>,
    rates: Box<dyn RateSource>,
    renderer: Box<dyn SummaryRenderer>,
    multiplier: Mutex<Multiplier>,
    cache_path: PathBuf,
    running: Mutex<()>,
}

impl Refresher {
    pub fn new(
        countries: Box<dyn CountrySource>,
        rates: Box<dyn RateSource>,
        renderer: Box<dyn SummaryRenderer>,
        multiplier: Multiplier,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            countries,
            rates,
            renderer,
            multiplier: Mutex::new(multiplier),
            cache_path: cache_path.into(),
            running: Mutex::new(()),
        }
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    pub fn refresh(&self, store: &dyn CountryStore) -> Result<RefreshReport> {
        // A poisoned guard only means an earlier run panicked; the store itself is consistent.
        let _running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        log::info!("refresh started");

        let countries = self
            .countries
            .fetch_countries()
            .map_err(|e| Error::upstream("countries", &e))?;
        let rates = self
            .rates
            .fetch_rates()
            .map_err(|e| Error::upstream("exchange rates", &e))?;

        let mut report = RefreshReport::default();
        {
            let mut multiplier = self
                .multiplier
                .lock()
                .map_err(|_| Error::Internal("multiplier lock poisoned".into()))?;
            for country in &countries {
                let Some(draft) = enrich(country, &rates, &mut multiplier) else {
                    log::debug!("skipping invalid country descriptor {:?}", country.name);
                    report.skipped += 1;
                    continue;
                };
                match store.upsert(&draft, Utc::now()) {
                    Ok(_) => report.upserted += 1,
                    Err(e) => {
                        log::warn!("failed to store {}: {}", draft.name, e);
                        report.failed += 1;
                    }
                }
            }
        }

        let records = store.all()?;
        let snapshot = stats::snapshot(&records);
        report.total = snapshot.total;

        let png = self
            .renderer
            .render(snapshot.total, &snapshot.top, Utc::now())?;
        storage::write_summary_image(&self.cache_path, &png)?;
        log::info!(
            "wrote summary image to {} ({} bytes)",
            self.cache_path.display(),
            png.len()
        );

        log::info!(
            "refresh finished: upserted={} skipped={} failed={} total={}",
            report.upserted,
            report.skipped,
            report.failed,
            report.total
        );
        Ok(report)
    }
}
