//! Shaping of raw upstream values into record fields.

use filmdata_core::languages::{self, UNKNOWN};
use filmdata_core::models::economic::normalize_iso3;
use filmdata_core::models::{CountryLanguageRecord, EconomicRecord};
use filmdata_core::MalformedRecord;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Which field of an `EconomicRecord` an indicator feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Gdp,
    Population,
}

impl Indicator {
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::Gdp => "gdp",
            Indicator::Population => "population",
        }
    }
}

/// Build one record for a (country, language code) pair. Unresolved codes
/// keep their raw value only when it is two characters long.
pub fn language_record(
    country: &str,
    capital: &str,
    population: u64,
    code: &str,
) -> CountryLanguageRecord {
    let resolution = languages::resolve(code);
    let language_code = if resolution.resolved || resolution.code.chars().count() == 2 {
        resolution.code
    } else {
        UNKNOWN.to_string()
    };

    CountryLanguageRecord {
        country: country.to_string(),
        capital: capital.to_string(),
        language_code,
        language_name: resolution.name,
        population,
    }
}

/// Keep the first record of every (country, language_code) pair.
pub fn dedupe_country_languages(records: Vec<CountryLanguageRecord>) -> Vec<CountryLanguageRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.country.clone(), r.language_code.clone())))
        .collect()
}

/// GeoNames reports population as a string, other sources as a number.
/// Absent or null means 0; anything else unparseable is malformed.
pub fn parse_population(value: Option<&Value>) -> Result<u64, MalformedRecord> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
            .ok_or_else(|| MalformedRecord::new(format!("invalid population {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| MalformedRecord::new(format!("invalid population {:?}", s))),
        Some(other) => Err(MalformedRecord::new(format!(
            "invalid population {}",
            other
        ))),
    }
}

/// Split a comma-separated language list, dropping blanks.
pub fn split_languages(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect()
}

/// Set one indicator for `code`, creating the record on first sight.
/// Returns `false` when the code is not a valid alpha-3.
pub fn merge_indicator(
    records: &mut BTreeMap<String, EconomicRecord>,
    indicator: Indicator,
    code: &str,
    value: f64,
) -> bool {
    let Some(iso) = normalize_iso3(code) else {
        return false;
    };

    let record = records
        .entry(iso.clone())
        .or_insert_with(|| EconomicRecord::empty(iso));
    match indicator {
        Indicator::Gdp => record.gdp = Some(value),
        Indicator::Population => record.population = Some(value.round() as i64),
    }
    true
}

/// The catalog API uses 0 for "not reported" budgets and revenues.
pub fn reported_amount(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Blank strings become `None`.
pub fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_record_keeps_two_letter_invariant() {
        assert_eq!(language_record("Peru", "Lima", 1, "es-PE").language_code, "es");

        let unresolved_two = language_record("X", "", 0, "zz");
        assert_eq!(unresolved_two.language_code, "zz");
        assert_eq!(unresolved_two.language_name, "Unknown");

        let unresolved_long = language_record("United States", "Washington", 1, "haw");
        assert_eq!(unresolved_long.language_code, "Unknown");
        assert_eq!(unresolved_long.language_name, "Unknown");
    }

    #[test]
    fn test_dedupe_keeps_first_pair() {
        let records = vec![
            language_record("Canada", "Ottawa", 5, "en-CA"),
            language_record("Canada", "Ottawa", 5, "fr-CA"),
            language_record("Canada", "Ottawa", 5, "en"),
            language_record("Jamaica", "Kingston", 3, "en"),
        ];

        let deduped = dedupe_country_languages(records);
        let pairs: Vec<(&str, &str)> = deduped
            .iter()
            .map(|r| (r.country.as_str(), r.language_code.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Canada", "en"), ("Canada", "fr"), ("Jamaica", "en")]);
    }

    #[test]
    fn test_parse_population_variants() {
        assert_eq!(parse_population(None).unwrap(), 0);
        assert_eq!(parse_population(Some(&json!(null))).unwrap(), 0);
        assert_eq!(parse_population(Some(&json!("84497"))).unwrap(), 84497);
        assert_eq!(parse_population(Some(&json!(331000000))).unwrap(), 331_000_000);
        assert_eq!(parse_population(Some(&json!(1.0e6))).unwrap(), 1_000_000);
        assert!(parse_population(Some(&json!("lots"))).is_err());
        assert!(parse_population(Some(&json!(-5))).is_err());
        assert!(parse_population(Some(&json!([1]))).is_err());
    }

    #[test]
    fn test_split_languages_drops_blanks() {
        assert_eq!(split_languages("en-US, es-US,,haw ,"), vec!["en-US", "es-US", "haw"]);
        assert!(split_languages(" , ").is_empty());
    }

    #[test]
    fn test_merge_indicator_fills_fields_independently() {
        let mut records = BTreeMap::new();
        assert!(merge_indicator(&mut records, Indicator::Gdp, "usa", 2.5e13));
        assert!(merge_indicator(&mut records, Indicator::Population, "USA", 331e6));
        assert!(merge_indicator(&mut records, Indicator::Gdp, "FRA", 2.7e12));
        assert!(!merge_indicator(&mut records, Indicator::Gdp, "", 1.0));

        assert_eq!(records["USA"].gdp, Some(2.5e13));
        assert_eq!(records["USA"].population, Some(331_000_000));
        assert_eq!(records["FRA"].population, None);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_reported_amount_treats_zero_as_missing() {
        assert_eq!(reported_amount(Some(&json!(0))), None);
        assert_eq!(reported_amount(None), None);
        assert_eq!(reported_amount(Some(&json!(1500000))), Some(1_500_000.0));
    }
}
