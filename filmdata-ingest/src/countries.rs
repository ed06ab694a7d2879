//! Country/language fetcher (GeoNames `countryInfoJSON`).

use filmdata_core::models::CountryLanguageRecord;
use filmdata_core::{FetchError, HttpClient, MalformedRecord};
use serde_json::Value;

use crate::normalize::{dedupe_country_languages, language_record, parse_population, split_languages};

pub struct CountryFetcher {
    client: HttpClient,
    url: String,
}

impl CountryFetcher {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch the country directory and flatten it into one record per
    /// (country, language). Only a transport failure is an error; bad
    /// entries are skipped.
    pub async fn fetch(&self) -> Result<Vec<CountryLanguageRecord>, FetchError> {
        tracing::info!("Fetching country directory");
        let payload = self.client.get_json(&self.url).await?;
        let records = parse_payload(&payload);
        tracing::info!(records = records.len(), "Country directory fetched");
        Ok(records)
    }
}

pub fn parse_payload(payload: &Value) -> Vec<CountryLanguageRecord> {
    let Some(entries) = payload.get("geonames").and_then(Value::as_array) else {
        // GeoNames answers auth and quota problems with 200 + a status object
        if let Some(status) = payload.get("status") {
            tracing::warn!(status = %status, "Country directory returned a status message instead of data");
        } else {
            tracing::warn!("Country directory payload has no 'geonames' list");
        }
        return Vec::new();
    };

    let mut records = Vec::new();
    for entry in entries {
        match parse_country(entry) {
            Ok(mut rows) => records.append(&mut rows),
            Err(e) => tracing::warn!(error = %e, "Skipping malformed country entry"),
        }
    }

    dedupe_country_languages(records)
}

/// Records for one GeoNames entry. Entries without a name or without
/// languages yield nothing.
pub fn parse_country(entry: &Value) -> Result<Vec<CountryLanguageRecord>, MalformedRecord> {
    let object = entry
        .as_object()
        .ok_or_else(|| MalformedRecord::new("country entry is not an object"))?;

    let text = |key: &str| -> Result<String, MalformedRecord> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(other) => Err(MalformedRecord::new(format!("{} is not a string: {}", key, other))),
        }
    };

    let name = text("countryName")?;
    let capital = text("capital")?;
    let languages = text("languages")?;

    if name.is_empty() || languages.is_empty() {
        return Ok(Vec::new());
    }

    let population = parse_population(object.get("population"))?;

    Ok(split_languages(&languages)
        .into_iter()
        .map(|code| language_record(&name, &capital, population, code))
        .collect())
}
