//! Persistence: the country record store, CSV/JSON export, and the summary image cache.

use crate::models::{CountryDraft, CountryRecord, name_key};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use csv::WriterBuilder;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Error raised by a [`CountryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    /// A value does not fit the column it is written to.
    #[error("population {0} does not fit the store")]
    PopulationOverflow(u64),
    /// A previous holder of the connection panicked.
    #[error("store connection lock poisoned")]
    Poisoned,
    /// Generic SQLite error.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Persisted mapping from case-insensitive country name to its record.
///
/// Implementations must keep exactly one record per [`name_key`].
pub trait CountryStore: Send + Sync {
    /// Look up a record by case-insensitive name.
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError>;

    /// Create or overwrite the record for `draft.name`, stamping it with `now`
    /// (or just past the previous stamp if the clock has not moved forward).
    fn upsert(&self, draft: &CountryDraft, now: DateTime<Utc>)
    -> Result<CountryRecord, StoreError>;

    /// Full snapshot, ordered by id.
    fn all(&self) -> Result<Vec<CountryRecord>, StoreError>;

    /// Remove the record for `name`. Returns whether a record was removed.
    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS countries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL UNIQUE,
    capital TEXT,
    region TEXT,
    population INTEGER NOT NULL,
    currency_code TEXT NOT NULL,
    exchange_rate REAL,
    estimated_gdp REAL,
    flag_url TEXT,
    last_refreshed_at TEXT NOT NULL
);";

const COLUMNS: &str = "id, name, capital, region, population, currency_code, \
                       exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// SQLite-backed [`CountryStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests and one-shot runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CountryRecord> {
    let population: i64 = row.get(4)?;
    let population = u64::try_from(population)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;
    Ok(CountryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        capital: row.get(2)?,
        region: row.get(3)?,
        population,
        currency_code: row.get(5)?,
        exchange_rate: row.get(6)?,
        estimated_gdp: row.get(7)?,
        flag_url: row.get(8)?,
        last_refreshed_at: row.get(9)?,
    })
}

impl CountryStore for SqliteStore {
    fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM countries WHERE name_key = ?1");
        let record = conn
            .query_row(&sql, params![name_key(name)], record_from_row)
            .optional()?;
        Ok(record)
    }

    fn upsert(
        &self,
        draft: &CountryDraft,
        now: DateTime<Utc>,
    ) -> Result<CountryRecord, StoreError> {
        let population = i64::try_from(draft.population)
            .map_err(|_| StoreError::PopulationOverflow(draft.population))?;
        let key = name_key(&draft.name);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<(i64, DateTime<Utc>)> = tx
            .query_row(
                "SELECT id, last_refreshed_at FROM countries WHERE name_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let id = match existing {
            Some((id, previous)) => {
                let stamp = if now > previous {
                    now
                } else {
                    previous + Duration::microseconds(1)
                };
                tx.execute(
                    "UPDATE countries SET name = ?1, capital = ?2, region = ?3, population = ?4, \
                     currency_code = ?5, exchange_rate = ?6, estimated_gdp = ?7, flag_url = ?8, \
                     last_refreshed_at = ?9 WHERE id = ?10",
                    params![
                        draft.name,
                        draft.capital,
                        draft.region,
                        population,
                        draft.currency_code,
                        draft.exchange_rate,
                        draft.estimated_gdp,
                        draft.flag_url,
                        stamp,
                        id
                    ],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO countries (name, name_key, capital, region, population, \
                     currency_code, exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        draft.name,
                        key,
                        draft.capital,
                        draft.region,
                        population,
                        draft.currency_code,
                        draft.exchange_rate,
                        draft.estimated_gdp,
                        draft.flag_url,
                        now
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        let sql = format!("SELECT {COLUMNS} FROM countries WHERE id = ?1");
        let record = tx.query_row(&sql, params![id], record_from_row)?;
        tx.commit()?;
        Ok(record)
    }

    fn all(&self) -> Result<Vec<CountryRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM countries ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM countries WHERE name_key = ?1",
            params![name_key(name)],
        )?;
        Ok(removed > 0)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

/// Prefix cells that spreadsheet tools would evaluate as formulas.
fn csv_safe(cell: &str) -> String {
    if cell.starts_with(['=', '+', '-', '@']) {
        format!("'{cell}")
    } else {
        cell.to_string()
    }
}

fn csv_safe_opt(cell: &Option<String>) -> Option<String> {
    cell.as_deref().map(csv_safe)
}

/// Save records as CSV with header.
pub fn save_csv<P: AsRef<Path>>(records: &[CountryRecord], path: P) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.serialize((
        "id",
        "name",
        "capital",
        "region",
        "population",
        "currency_code",
        "exchange_rate",
        "estimated_gdp",
        "flag_url",
        "last_refreshed_at",
    ))?;
    for r in records {
        wtr.serialize((
            r.id,
            csv_safe(&r.name),
            csv_safe_opt(&r.capital),
            csv_safe_opt(&r.region),
            r.population,
            csv_safe(&r.currency_code),
            r.exchange_rate,
            r.estimated_gdp,
            csv_safe_opt(&r.flag_url),
            r.last_refreshed_at.to_rfc3339(),
        ))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save records as a pretty JSON array.
pub fn save_json<P: AsRef<Path>>(records: &[CountryRecord], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(records)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Replace the cached summary image. Readers see either the old or the new file.
pub fn write_summary_image(path: &Path, png: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(png)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read the cached summary image.
pub fn read_summary_image(path: &Path) -> io::Result<Vec<u8>> {
    std::fs::read(path)
}
