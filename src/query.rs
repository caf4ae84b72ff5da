//! Read-side filtering and ordering over a snapshot of stored records.

use crate::models::CountryRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Recognized orderings for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    GdpAsc,
    GdpDesc,
}

impl SortOrder {
    /// Parse a `sort` parameter (`gdp_asc`, `gdp_desc`, any case). Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gdp_asc" => Some(Self::GdpAsc),
            "gdp_desc" => Some(Self::GdpDesc),
            _ => None,
        }
    }
}

/// Parameters of `GET /countries`. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort.as_deref().and_then(SortOrder::parse)
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|f| !f.is_empty())
}

fn matches(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(f) => value.is_some_and(|v| v.to_lowercase() == f.to_lowercase()),
    }
}

/// Null GDP sorts last regardless of direction.
fn cmp_gdp(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match order {
            SortOrder::GdpAsc => x.total_cmp(&y),
            SortOrder::GdpDesc => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter by region and currency (case-insensitive, ANDed), then optionally sort by GDP.
///
/// Unsorted output keeps the input order; the sort is stable.
pub fn apply(records: Vec<CountryRecord>, query: &ListQuery) -> Vec<CountryRecord> {
    let region = active(&query.region);
    let currency = active(&query.currency);

    let mut out: Vec<CountryRecord> = records
        .into_iter()
        .filter(|r| matches(region, r.region.as_deref()))
        .filter(|r| matches(currency, Some(r.currency_code.as_str())))
        .collect();

    if let Some(order) = query.sort_order() {
        out.sort_by(|a, b| cmp_gdp(a.estimated_gdp, b.estimated_gdp, order));
    }
    out
}
