use crate::models::{CountryRecord, Status, TopEntry};
use serde::{Deserialize, Serialize};

/// Number of entries shown in the summary ranking.
pub const TOP_N: usize = 5;

/// Store-wide figures used for the summary image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub total: usize,
    pub top: Vec<TopEntry>,
}

/// Compute the snapshot over a full read of the store.
pub fn snapshot(records: &[CountryRecord]) -> Snapshot {
    Snapshot {
        total: records.len(),
        top: top_by_gdp(records, TOP_N),
    }
}

/// The `n` records with the highest estimated GDP, descending. Records without a GDP are not ranked.
pub fn top_by_gdp(records: &[CountryRecord], n: usize) -> Vec<TopEntry> {
    let mut ranked: Vec<TopEntry> = records
        .iter()
        .filter_map(|r| {
            r.estimated_gdp.map(|gdp| TopEntry {
                name: r.name.clone(),
                estimated_gdp: gdp,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.estimated_gdp.total_cmp(&a.estimated_gdp));
    ranked.truncate(n);
    ranked
}

/// Count and most recent refresh stamp.
pub fn status(records: &[CountryRecord]) -> Status {
    Status {
        total_countries: records.len(),
        last_refreshed_at: records.iter().map(|r| r.last_refreshed_at).max(),
    }
}
