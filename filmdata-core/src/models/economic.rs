use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{Column, SqlType, SqlValue, Tabular};
use crate::countries::ALPHA3_CODES;

/// GDP and population for one country. A missing indicator stays `None`;
/// zero is a real value and is never used as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicRecord {
    /// Uppercase ISO-3166 alpha-3.
    pub iso_code: String,
    pub gdp: Option<f64>,
    pub population: Option<i64>,
}

impl EconomicRecord {
    pub fn empty(iso_code: impl Into<String>) -> Self {
        Self {
            iso_code: iso_code.into(),
            gdp: None,
            population: None,
        }
    }

    pub fn has_any_value(&self) -> bool {
        self.gdp.is_some() || self.population.is_some()
    }
}

/// Normalizes an upstream country code to uppercase ISO-3166 alpha-3.
/// Blanks and codes outside the standard (World Bank regional and income
/// aggregates such as `WLD`, `EUU`, `HIC`) are rejected.
pub fn normalize_iso3(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    ALPHA3_CODES
        .binary_search(&code.as_str())
        .ok()
        .map(|_| code)
}

impl Tabular for EconomicRecord {
    const TABLE: &'static str = "world_bank_data";
    const COLUMNS: &'static [Column] = &[
        Column::key("iso_code", SqlType::Text),
        Column::nullable("gdp", SqlType::Real),
        Column::nullable("population", SqlType::Integer),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(Some(self.iso_code.clone())),
            SqlValue::Real(self.gdp),
            SqlValue::Integer(self.population),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            iso_code: row.try_get("iso_code")?,
            gdp: row.try_get("gdp")?,
            population: row.try_get("population")?,
        })
    }
}
