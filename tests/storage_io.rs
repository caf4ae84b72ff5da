use chrono::Utc;
use country_rates::models::{CountryDraft, CountryRecord};
use country_rates::storage::{self, CountryStore, SqliteStore};
use std::fs;
use tempfile::tempdir;

fn draft(name: &str, gdp: Option<f64>) -> CountryDraft {
    CountryDraft {
        name: name.into(),
        capital: Some("Capital".into()),
        region: Some("Europe".into()),
        population: 5_000_000,
        currency_code: "EUR".into(),
        exchange_rate: gdp.map(|_| 0.92),
        estimated_gdp: gdp,
        flag_url: Some("https://flags.example/x.svg".into()),
    }
}

#[test]
fn records_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("countries.db");
    {
        let store = SqliteStore::open(&db).unwrap();
        store.upsert(&draft("Ireland", Some(1.0e9)), Utc::now()).unwrap();
        store.upsert(&draft("Malta", None), Utc::now()).unwrap();
    }
    let store = SqliteStore::open(&db).unwrap();
    let all = store.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Ireland");
    assert_eq!(all[1].name, "Malta");
    assert!(all[0].id < all[1].id);
    assert_eq!(all[1].estimated_gdp, None);
}

#[test]
fn lookup_and_delete_ignore_case() {
    let store = SqliteStore::open_in_memory().unwrap();
    let stored = store.upsert(&draft("Åland Islands", Some(2.0)), Utc::now()).unwrap();

    let found = store.find_by_name("åLAND islands").unwrap().unwrap();
    assert_eq!(found, stored);
    assert!(store.find_by_name("Aland Islands").unwrap().is_none());

    assert!(store.delete_by_name("ÅLAND ISLANDS").unwrap());
    assert!(!store.delete_by_name("Åland Islands").unwrap());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn upsert_overwrites_every_mutable_field() {
    let store = SqliteStore::open_in_memory().unwrap();
    let first = store.upsert(&draft("Estonia", Some(5.0)), Utc::now()).unwrap();

    let mut changed = draft("estonia", None);
    changed.capital = None;
    changed.region = Some("Baltics".into());
    changed.population = 1_331_057;
    changed.currency_code = "EEK".into();
    changed.flag_url = None;
    let second = store.upsert(&changed, Utc::now()).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "estonia");
    assert_eq!(second.capital, None);
    assert_eq!(second.region.as_deref(), Some("Baltics"));
    assert_eq!(second.population, 1_331_057);
    assert_eq!(second.currency_code, "EEK");
    assert_eq!(second.exchange_rate, None);
    assert_eq!(second.estimated_gdp, None);
    assert_eq!(second.flag_url, None);
    assert!(second.last_refreshed_at > first.last_refreshed_at);
}

#[test]
fn stamp_advances_even_if_clock_does_not() {
    let store = SqliteStore::open_in_memory().unwrap();
    let now = Utc::now();
    let a = store.upsert(&draft("Latvia", None), now).unwrap();
    let b = store.upsert(&draft("Latvia", None), now).unwrap();
    let c = store.upsert(&draft("Latvia", None), now - chrono::Duration::hours(1)).unwrap();
    assert!(a.last_refreshed_at < b.last_refreshed_at);
    assert!(b.last_refreshed_at < c.last_refreshed_at);
}

fn records(store: &SqliteStore) -> Vec<CountryRecord> {
    store.all().unwrap()
}

#[test]
fn save_csv_and_json() {
    let store = SqliteStore::open_in_memory().unwrap();
    for name in ["Spain", "Portugal", "Andorra"] {
        store.upsert(&draft(name, Some(10.0)), Utc::now()).unwrap();
    }
    let rows = records(&store);
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("countries.csv");
    storage::save_csv(&rows, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("id,name,capital,region,population,currency_code,"));
    assert_eq!(csv_txt.lines().count(), 1 + rows.len());

    let json_path = dir.path().join("countries.json");
    storage::save_json(&rows, &json_path).unwrap();
    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), rows.len());
    assert_eq!(arr[0]["currency_code"], "EUR");
    assert!(arr[0].get("estimated_gdp").is_some());
    assert!(arr[0].get("last_refreshed_at").is_some());
}

// Spreadsheet tools evaluate cells starting with =, +, - or @; exported cells get a quote prefix.
#[test]
fn csv_cells_are_prefixed_to_avoid_formulas() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut evil = draft("=HYPERLINK(\"http://evil\")", None);
    evil.capital = Some("+SUM(A1:A9)".into());
    evil.region = Some("@foo".into());
    store.upsert(&evil, Utc::now()).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("injection.csv");
    storage::save_csv(&records(&store), &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let row = rdr.records().next().expect("one data row expected").unwrap();
    let cell = |name: &str| {
        let idx = headers.iter().position(|h| h == name).expect("header present");
        row.get(idx).unwrap().to_string()
    };

    assert_eq!(cell("name"), "'=HYPERLINK(\"http://evil\")");
    assert_eq!(cell("capital"), "'+SUM(A1:A9)");
    assert_eq!(cell("region"), "'@foo");
    assert_eq!(cell("currency_code"), "EUR");
}
