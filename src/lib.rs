//! country_rates
//!
//! Aggregates country metadata from a public reference API, enriches it with USD
//! exchange rates, persists the merged records in SQLite, and serves them over a
//! small REST surface. Pairs with the `country-rates` binary.
//!
//! ### Features
//! - Refresh pipeline: fetch, merge, validate, upsert by case-insensitive name
//! - Filtering by region/currency and sorting by estimated GDP
//! - Status probe and a PNG summary image of the top countries
//! - CSV/JSON export of the stored records
//!
//! ### Example
//! ```no_run
//! use country_rates::{CountryService, ListQuery, Settings};
//!
//! let service = CountryService::from_settings(&Settings::default())?;
//! let report = service.refresh()?;
//! println!("{} countries stored", report.total);
//! let europe = service.list(&ListQuery {
//!     region: Some("Europe".into()),
//!     sort: Some("gdp_desc".into()),
//!     ..Default::default()
//! })?;
//! country_rates::storage::save_csv(&europe, "europe.csv")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod refresh;
pub mod server;
pub mod service;
pub mod stats;
pub mod storage;
pub mod viz;

pub use api::Client;
pub use config::Settings;
pub use error::{Error, ErrorKind, Result};
pub use models::{CountryRecord, RefreshReport, Status};
pub use query::{ListQuery, SortOrder};
pub use service::CountryService;
