//! CSV snapshots: one file per logical table, header row = field names.
//!
//! Snapshots are the hand-off between the fetchers and the loader, and
//! are always overwritten whole.
//!
//! An empty cell reads back as `None` for optional fields, so `Some("")`
//! does not survive a round trip. Fetchers never build blank optionals.

use filmdata_core::models::Tabular;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::store::StoreError;

pub const LANGUAGE_MARKET_CSV: &str = "language_market.csv";
pub const WORLD_BANK_CSV: &str = "world_bank_data.csv";
pub const MOVIES_CSV: &str = "movies.csv";
pub const GDP_CACHE_CSV: &str = "gdp_population_cache.csv";

pub fn save_csv_snapshot<T: Tabular + Serialize>(
    path: &Path,
    records: &[T],
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        // serde only emits a header alongside the first row
        writer.write_record(T::COLUMNS.iter().map(|c| c.name))?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = records.len(), "Saved CSV snapshot");
    Ok(())
}

pub fn load_csv_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmdata_core::models::{CountryLanguageRecord, EconomicRecord, MovieRecord};

    #[test]
    fn test_country_snapshot_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data").join(LANGUAGE_MARKET_CSV);

        let records = vec![
            CountryLanguageRecord {
                country: "Switzerland".to_string(),
                capital: "Bern".to_string(),
                language_code: "de".to_string(),
                language_name: "German".to_string(),
                population: 8_700_000,
            },
            CountryLanguageRecord {
                country: "Switzerland".to_string(),
                capital: "Bern".to_string(),
                language_code: "fr".to_string(),
                language_name: "French".to_string(),
                population: 8_700_000,
            },
            CountryLanguageRecord {
                country: "Antarctica".to_string(),
                capital: "".to_string(),
                language_code: "Unknown".to_string(),
                language_name: "Unknown".to_string(),
                population: 0,
            },
        ];

        save_csv_snapshot(&path, &records).unwrap();
        let loaded: Vec<CountryLanguageRecord> = load_csv_snapshot(&path).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_economic_snapshot_keeps_missing_apart_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORLD_BANK_CSV);

        let records = vec![
            EconomicRecord {
                iso_code: "USA".to_string(),
                gdp: Some(25_000_000_000_000.0),
                population: Some(331_000_000),
            },
            EconomicRecord {
                iso_code: "FRA".to_string(),
                gdp: Some(2_782_905_325_625.38),
                population: None,
            },
            EconomicRecord {
                iso_code: "ATA".to_string(),
                gdp: Some(0.0),
                population: None,
            },
        ];

        save_csv_snapshot(&path, &records).unwrap();
        let loaded: Vec<EconomicRecord> = load_csv_snapshot(&path).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_movie_snapshot_keeps_lists_with_commas_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MOVIES_CSV);

        let records = vec![
            MovieRecord {
                id: 120,
                title: "The Lord of the Rings: The Fellowship of the Ring".to_string(),
                budget: Some(93_000_000.0),
                revenue: Some(871_368_364.0),
                release_date: Some("2001-12-18".to_string()),
                language: Some("en".to_string()),
                genres: vec!["Adventure".to_string(), "Fantasy, High".to_string()],
                cast: vec!["Elijah Wood".to_string(), "Ian \"Gandalf\" McKellen".to_string()],
            },
            MovieRecord {
                id: 7,
                title: "Listing only".to_string(),
                budget: None,
                revenue: None,
                release_date: None,
                language: None,
                genres: vec![],
                cast: vec![],
            },
        ];

        save_csv_snapshot(&path, &records).unwrap();
        let loaded: Vec<MovieRecord> = load_csv_snapshot(&path).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_blank_optional_text_reads_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MOVIES_CSV);
        let record = MovieRecord {
            id: 3,
            title: "Undated".to_string(),
            budget: Some(1_000_000.0),
            revenue: None,
            release_date: Some(String::new()),
            language: Some(String::new()),
            genres: vec![],
            cast: vec![],
        };

        save_csv_snapshot(&path, &[record]).unwrap();
        let loaded: Vec<MovieRecord> = load_csv_snapshot(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].release_date, None);
        assert_eq!(loaded[0].language, None);
        assert_eq!(loaded[0].budget, Some(1_000_000.0));
    }

    #[test]
    fn test_empty_snapshot_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORLD_BANK_CSV);

        save_csv_snapshot::<EconomicRecord>(&path, &[]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "iso_code,gdp,population");
        let loaded: Vec<EconomicRecord> = load_csv_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Vec<EconomicRecord>, _> =
            load_csv_snapshot(&dir.path().join("absent.csv"));
        assert!(result.is_err());
    }
}
