use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{Column, SqlType, SqlValue, Tabular};

/// One (country, language) pair. A country with N languages yields N
/// records that share its population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryLanguageRecord {
    pub country: String,
    pub capital: String,
    /// Two-letter ISO 639-1 code, or `"Unknown"`.
    pub language_code: String,
    pub language_name: String,
    pub population: u64,
}

impl Tabular for CountryLanguageRecord {
    const TABLE: &'static str = "language_market";
    const COLUMNS: &'static [Column] = &[
        Column::required("country", SqlType::Text),
        Column::required("capital", SqlType::Text),
        Column::required("language_code", SqlType::Text),
        Column::required("language_name", SqlType::Text),
        Column::required("population", SqlType::Integer),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(Some(self.country.clone())),
            SqlValue::Text(Some(self.capital.clone())),
            SqlValue::Text(Some(self.language_code.clone())),
            SqlValue::Text(Some(self.language_name.clone())),
            SqlValue::Integer(Some(i64::try_from(self.population).unwrap_or(i64::MAX))),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let population: i64 = row.try_get("population")?;
        Ok(Self {
            country: row.try_get("country")?,
            capital: row.try_get("capital")?,
            language_code: row.try_get("language_code")?,
            language_name: row.try_get("language_name")?,
            population: u64::try_from(population).unwrap_or(0),
        })
    }
}
