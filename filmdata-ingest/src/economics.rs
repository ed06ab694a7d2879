//! Macroeconomic fetcher (World Bank indicators API)
//!
//! Two ways in:
//! - **bulk**: one all-countries request per indicator for the target year,
//!   merged into a map keyed by alpha-3 code
//! - **incremental**: two per-country requests for every known code that is
//!   not in `world_bank_data` yet, appended row by row so an interrupted
//!   run picks up where it stopped
//!
//! World Bank payloads are `[metadata, [entry, ...]]`.

use filmdata_core::config::EconomicsConfig;
use filmdata_core::models::{EconomicRecord, Tabular};
use filmdata_core::HttpClient;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::normalize::{merge_indicator, Indicator};
use crate::snapshot::save_csv_snapshot;
use crate::store::{ensure_table, existing_keys, insert_rows, StoreError};

pub struct EconomicFetcher {
    client: HttpClient,
    base_url: String,
    config: EconomicsConfig,
}

/// Outcome of one incremental pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalReport {
    pub checked: usize,
    pub skipped_existing: usize,
    pub inserted: usize,
    pub empty: usize,
}

impl EconomicFetcher {
    pub fn new(client: HttpClient, base_url: impl Into<String>, config: EconomicsConfig) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        }
    }

    fn indicator_id(&self, indicator: Indicator) -> &str {
        match indicator {
            Indicator::Gdp => &self.config.gdp_indicator,
            Indicator::Population => &self.config.population_indicator,
        }
    }

    fn bulk_url(&self, indicator: Indicator) -> String {
        format!(
            "{}/country/all/indicator/{}?date={}&format=json&per_page={}",
            self.base_url,
            self.indicator_id(indicator),
            self.config.target_year,
            self.config.per_page
        )
    }

    fn country_url(&self, code: &str, indicator: Indicator) -> String {
        format!(
            "{}/country/{}/indicator/{}?format=json&per_page={}",
            self.base_url,
            code,
            self.indicator_id(indicator),
            self.config.per_page
        )
    }

    /// GDP and population for every country in the target year. A failed
    /// indicator is logged and leaves its field `None` everywhere.
    pub async fn fetch_all(&self) -> BTreeMap<String, EconomicRecord> {
        let mut records = BTreeMap::new();

        for indicator in [Indicator::Gdp, Indicator::Population] {
            match self.client.get_json(&self.bulk_url(indicator)).await {
                Ok(payload) => {
                    let merged = merge_indicator_payload(&mut records, indicator, &payload);
                    tracing::info!(
                        indicator = indicator.label(),
                        year = self.config.target_year,
                        merged,
                        "Indicator fetched"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        indicator = indicator.label(),
                        error = %e,
                        "Indicator fetch failed, continuing without it"
                    );
                }
            }
        }

        records
    }

    /// Both indicators for one country in `incremental_year`.
    pub async fn fetch_country(&self, code: &str) -> EconomicRecord {
        let mut record = EconomicRecord::empty(code);
        record.gdp = self.fetch_country_value(code, Indicator::Gdp).await;
        record.population = self
            .fetch_country_value(code, Indicator::Population)
            .await
            .map(|v| v.round() as i64);
        record
    }

    async fn fetch_country_value(&self, code: &str, indicator: Indicator) -> Option<f64> {
        let result = self.client.get_json(&self.country_url(code, indicator)).await;
        tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;

        match result {
            Ok(payload) => value_for_year(&payload, self.config.incremental_year),
            Err(e) => {
                tracing::warn!(code, indicator = indicator.label(), error = %e, "Country indicator fetch failed");
                None
            }
        }
    }

    /// Fill `world_bank_data` for `codes` not already present. Rows are
    /// inserted one at a time; new rows are also written to `cache_path`.
    pub async fn run_incremental(
        &self,
        pool: &SqlitePool,
        codes: &[&str],
        cache_path: Option<&Path>,
    ) -> Result<IncrementalReport, StoreError> {
        let table = EconomicRecord::TABLE;
        ensure_table::<EconomicRecord>(pool, table).await?;
        let existing = existing_keys(pool, table, "iso_code").await?;

        let mut report = IncrementalReport::default();
        let mut fetched = Vec::new();

        for code in codes {
            report.checked += 1;
            if existing.contains(*code) {
                report.skipped_existing += 1;
                continue;
            }

            let record = self.fetch_country(code).await;
            if !record.has_any_value() {
                tracing::debug!(code, "No indicator values for target year");
                report.empty += 1;
                continue;
            }

            insert_rows(pool, table, std::slice::from_ref(&record)).await?;
            report.inserted += 1;
            fetched.push(record);
        }

        match cache_path {
            Some(path) if !fetched.is_empty() => save_csv_snapshot(path, &fetched)?,
            _ => {}
        }

        tracing::info!(
            checked = report.checked,
            skipped = report.skipped_existing,
            inserted = report.inserted,
            empty = report.empty,
            "Incremental economic fetch complete"
        );

        Ok(report)
    }
}

fn entries(payload: &Value) -> &[Value] {
    payload
        .get(1)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Merge one indicator payload. Entries with a null value or without an
/// ISO-3166 country code (regional aggregates included) are ignored.
/// Returns how many entries were merged.
pub fn merge_indicator_payload(
    records: &mut BTreeMap<String, EconomicRecord>,
    indicator: Indicator,
    payload: &Value,
) -> usize {
    let mut merged = 0;
    for entry in entries(payload) {
        let code = entry.get("countryiso3code").and_then(Value::as_str);
        let value = entry.get("value").and_then(Value::as_f64);

        if let (Some(code), Some(value)) = (code, value) {
            if merge_indicator(records, indicator, code, value) {
                merged += 1;
            }
        }
    }
    merged
}

/// First non-null value whose `date` is exactly `year`.
pub fn value_for_year(payload: &Value, year: i32) -> Option<f64> {
    entries(payload).iter().find_map(|entry| {
        let date = entry.get("date").and_then(|d| match d {
            Value::String(s) => s.trim().parse::<i32>().ok(),
            Value::Number(n) => n.as_i64().map(|n| n as i32),
            _ => None,
        })?;
        if date != year {
            return None;
        }
        entry.get("value").and_then(Value::as_f64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmdata_core::config::HttpConfig;
    use filmdata_core::db::create_memory_pool;
    use filmdata_core::models::EconomicRecord;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn indicator_payload(rows: serde_json::Value) -> serde_json::Value {
        json!([{ "page": 1, "pages": 1, "per_page": 400, "total": 3 }, rows])
    }

    fn test_config() -> EconomicsConfig {
        EconomicsConfig {
            request_delay_ms: 0,
            ..EconomicsConfig::default()
        }
    }

    fn test_client() -> HttpClient {
        HttpClient::new(&HttpConfig {
            max_attempts: 1,
            retry_delay_ms: 0,
            ..HttpConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_merge_usa_from_both_payloads_and_fra_from_gdp_only() {
        let gdp = indicator_payload(json!([
            { "countryiso3code": "USA", "date": "2022", "value": 25000000000000.0 },
            { "countryiso3code": "FRA", "date": "2022", "value": 2782905325625.38 },
            { "countryiso3code": "", "date": "2022", "value": 1.0 }
        ]));
        let population = indicator_payload(json!([
            { "countryiso3code": "USA", "date": "2022", "value": 331000000 },
            { "countryiso3code": "FRA", "date": "2022", "value": null }
        ]));

        let mut records = BTreeMap::new();
        assert_eq!(merge_indicator_payload(&mut records, Indicator::Gdp, &gdp), 2);
        assert_eq!(
            merge_indicator_payload(&mut records, Indicator::Population, &population),
            1
        );

        assert_eq!(
            records["USA"],
            EconomicRecord {
                iso_code: "USA".to_string(),
                gdp: Some(25_000_000_000_000.0),
                population: Some(331_000_000),
            }
        );
        assert_eq!(
            records["FRA"],
            EconomicRecord {
                iso_code: "FRA".to_string(),
                gdp: Some(2_782_905_325_625.38),
                population: None,
            }
        );
    }

    #[test]
    fn test_error_payload_merges_nothing() {
        let payload = json!([{ "message": [{ "id": "120", "value": "Invalid value" }] }]);
        let mut records = BTreeMap::new();
        assert_eq!(merge_indicator_payload(&mut records, Indicator::Gdp, &payload), 0);
        assert!(records.is_empty());
    }

    #[test]
    fn test_regional_aggregates_are_not_stored() {
        let gdp = indicator_payload(json!([
            { "countryiso3code": "WLD", "date": "2022", "value": 1.0e14 },
            { "countryiso3code": "EUU", "date": "2022", "value": 1.7e13 },
            { "countryiso3code": "ARB", "date": "2022", "value": 3.5e12 },
            { "countryiso3code": "USA", "date": "2022", "value": 2.5e13 }
        ]));

        let mut records = BTreeMap::new();
        assert_eq!(merge_indicator_payload(&mut records, Indicator::Gdp, &gdp), 1);

        let codes: Vec<&str> = records.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["USA"]);
    }

    #[test]
    fn test_value_for_year_matches_exact_year_only() {
        let payload = indicator_payload(json!([
            { "date": "2024", "value": 3.0 },
            { "date": "2023", "value": null },
            { "date": "2023", "value": 2.0 },
            { "date": "2022", "value": 1.0 }
        ]));

        assert_eq!(value_for_year(&payload, 2023), Some(2.0));
        assert_eq!(value_for_year(&payload, 2022), Some(1.0));
        assert_eq!(value_for_year(&payload, 2019), None);
    }

    #[tokio::test]
    async fn test_fetch_all_survives_one_failed_indicator() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/country/all/indicator/NY.GDP.MKTP.CD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(indicator_payload(json!([
                { "countryiso3code": "FRA", "date": "2022", "value": 2.78e12 }
            ]))))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/country/all/indicator/SP.POP.TOTL"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let fetcher = EconomicFetcher::new(test_client(), mock_server.uri(), test_config());
        let records = fetcher.fetch_all().await;

        assert_eq!(records.len(), 1);
        assert_eq!(records["FRA"].gdp, Some(2.78e12));
        assert_eq!(records["FRA"].population, None);
    }

    #[tokio::test]
    async fn test_incremental_skips_codes_already_stored() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/country/DEU/indicator/NY.GDP.MKTP.CD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(indicator_payload(json!([
                { "countryiso3code": "DEU", "date": "2023", "value": 4.5e12 }
            ]))))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/country/DEU/indicator/SP.POP.TOTL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(indicator_payload(json!([
                { "countryiso3code": "DEU", "date": "2023", "value": 84482267 }
            ]))))
            .mount(&mock_server)
            .await;

        // ATA has no data for the year
        Mock::given(method("GET"))
            .and(path("/country/ATA/indicator/NY.GDP.MKTP.CD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(indicator_payload(json!([
                { "countryiso3code": "ATA", "date": "2023", "value": null }
            ]))))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/country/ATA/indicator/SP.POP.TOTL"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        // USA is already stored and must not be requested at all
        Mock::given(method("GET"))
            .and(path("/country/USA/indicator/NY.GDP.MKTP.CD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let pool = create_memory_pool().await.unwrap();
        ensure_table::<EconomicRecord>(&pool, "world_bank_data")
            .await
            .unwrap();
        insert_rows(&pool, "world_bank_data", &[EconomicRecord::empty("USA")])
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache.csv");
        let fetcher = EconomicFetcher::new(test_client(), mock_server.uri(), test_config());

        let report = fetcher
            .run_incremental(&pool, &["USA", "DEU", "ATA"], Some(&cache))
            .await
            .unwrap();

        assert_eq!(
            report,
            IncrementalReport {
                checked: 3,
                skipped_existing: 1,
                inserted: 1,
                empty: 1,
            }
        );

        let keys = existing_keys(&pool, "world_bank_data", "iso_code")
            .await
            .unwrap();
        assert_eq!(keys.len(), 2);

        let cached: Vec<EconomicRecord> = crate::snapshot::load_csv_snapshot(&cache).unwrap();
        assert_eq!(
            cached,
            vec![EconomicRecord {
                iso_code: "DEU".to_string(),
                gdp: Some(4.5e12),
                population: Some(84_482_267),
            }]
        );
    }
}
