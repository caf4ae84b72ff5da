use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stored, enriched country (one row = one country).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: String,
    /// USD to `currency_code` rate; `None` when the rate source does not know the currency.
    pub exchange_rate: Option<f64>,
    /// Derived proxy, `None` exactly when `exchange_rate` is `None`.
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// A validated, enriched descriptor ready to be upserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryDraft {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: String,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

/// Case-folded lookup key used for the "one record per name" rule.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Raw country descriptor as returned by the countries API.
///
/// Every field is optional at parse time and parsing never rejects an object: text fields
/// that are not text become `None` (numbers and booleans keep their textual form), and a
/// `currencies` value that is not an array reads as empty. Validation happens in the
/// refresh pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCountry {
    #[serde(default, deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub capital: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub region: Option<String>,
    /// Some mirrors encode `population` as a string or a float. Accept all and
    /// normalize to `u64`; negative or non-numeric values become `None`.
    #[serde(default, deserialize_with = "de_population")]
    pub population: Option<u64>,
    #[serde(default, deserialize_with = "de_text")]
    pub flag: Option<String>,
    #[serde(default, deserialize_with = "de_currencies")]
    pub currencies: Vec<SourceCurrency>,
}

impl SourceCountry {
    /// Code of the first listed currency, if it carries a non-empty code.
    pub fn primary_currency_code(&self) -> Option<&str> {
        self.currencies
            .first()
            .and_then(|c| c.code.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCurrency {
    #[serde(default, deserialize_with = "de_text")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub symbol: Option<String>,
}

/// Payload of the exchange-rate endpoint (`/v6/latest/USD`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatesResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub base_code: Option<String>,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

/// Serde helper: parse a population from a JSON number (integer or float) or a string.
fn de_population<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct PopulationVisitor;

    impl<'de> Visitor<'de> for PopulationVisitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or number representing a population count")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(u64::try_from(v).ok())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_finite() && v >= 0.0 {
                Ok(Some(v.round() as u64))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(s.trim().parse::<u64>().ok())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(PopulationVisitor)
}

/// Serde helper: read a scalar as text. Strings pass through, numbers and booleans are
/// stringified, and null, arrays, or objects become `None`.
fn de_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a JSON scalar")
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(s.to_string()))
        }

        fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(s))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

/// Serde helper: a currency list. Anything but an array reads as empty; array elements
/// that are not currency objects become empty currencies.
fn de_currencies<'de, D>(deserializer: D) -> Result<Vec<SourceCurrency>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

/// Name and GDP of one entry in the summary ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopEntry {
    pub name: String,
    pub estimated_gdp: f64,
}

/// Outcome counts of one refresh run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshReport {
    /// Descriptors written (created or updated).
    pub upserted: usize,
    /// Descriptors discarded by validation.
    pub skipped: usize,
    /// Valid descriptors whose write failed.
    pub failed: usize,
    /// Records in the store after the run.
    pub total: usize,
}

/// Store-wide status probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub total_countries: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}
