//! Operations behind the REST surface, independent of HTTP.

use crate::api::Client;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::{CountryRecord, RefreshReport, Status};
use crate::query::{self, ListQuery};
use crate::refresh::{Multiplier, Refresher};
use crate::stats;
use crate::storage::{self, CountryStore, SqliteStore};
use crate::viz::PngSummaryRenderer;
use std::io::ErrorKind as IoErrorKind;
use std::sync::Arc;

pub const REFRESH_MESSAGE: &str = "Countries refreshed successfully";
pub const COUNTRY_NOT_FOUND: &str = "Country not found";
pub const IMAGE_NOT_FOUND: &str = "Summary image not found";

/// Store plus refresh pipeline; cheap to clone and share across handlers.
#[derive(Clone)]
pub struct CountryService {
    store: Arc<dyn CountryStore>,
    refresher: Arc<Refresher>,
}

impl CountryService {
    pub fn new(store: Arc<dyn CountryStore>, refresher: Refresher) -> Self {
        Self {
            store,
            refresher: Arc::new(refresher),
        }
    }

    /// Wire the production collaborators from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = SqliteStore::open(&settings.database_path)?;
        let client = Client::from_settings(settings)?;
        let multiplier = match settings.seed {
            Some(seed) => Multiplier::seeded(seed),
            None => Multiplier::random(),
        };
        let refresher = Refresher::new(
            Box::new(client.clone()),
            Box::new(client),
            Box::new(PngSummaryRenderer::new(settings.font_path.clone())),
            multiplier,
            settings.cache_path.clone(),
        );
        Ok(Self::new(Arc::new(store), refresher))
    }

    pub fn store(&self) -> &dyn CountryStore {
        self.store.as_ref()
    }

    pub fn refresh(&self) -> Result<RefreshReport> {
        self.refresher.refresh(self.store.as_ref())
    }

    pub fn list(&self, query: &ListQuery) -> Result<Vec<CountryRecord>> {
        let records = self.store.all()?;
        Ok(query::apply(records, query))
    }

    pub fn get_by_name(&self, name: &str) -> Result<CountryRecord> {
        self.store
            .find_by_name(name)?
            .ok_or_else(|| Error::NotFound(COUNTRY_NOT_FOUND.into()))
    }

    pub fn delete_by_name(&self, name: &str) -> Result<()> {
        if self.store.delete_by_name(name)? {
            log::info!("deleted country {}", name);
            Ok(())
        } else {
            Err(Error::NotFound(COUNTRY_NOT_FOUND.into()))
        }
    }

    pub fn status(&self) -> Result<Status> {
        let records = self.store.all()?;
        Ok(stats::status(&records))
    }

    /// Bytes of the last rendered summary image.
    pub fn summary_image(&self) -> Result<Vec<u8>> {
        storage::read_summary_image(self.refresher.cache_path()).map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                Error::NotFound(IMAGE_NOT_FOUND.into())
            } else {
                Error::Io(e)
            }
        })
    }
}
