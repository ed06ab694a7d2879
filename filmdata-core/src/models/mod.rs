//! Record types and their relational shape.
//!
//! Each record type maps to exactly one table whose columns are the record's
//! fields. `Tabular` carries that mapping so the store can drop, recreate,
//! and fill a table without per-type SQL.

pub mod artifact;
pub mod country;
pub mod economic;
pub mod movie;

use sqlx::sqlite::SqliteRow;

pub use artifact::{ClassifierParams, ScalerParams, TrainedClassifierArtifact, TrainingMetrics};
pub use country::CountryLanguageRecord;
pub use economic::EconomicRecord;
pub use movie::{CastRow, GenreRow, MovieRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Column {
    pub const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            primary_key: false,
        }
    }

    pub const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
            primary_key: false,
        }
    }

    pub const fn key(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            primary_key: true,
        }
    }
}

/// A value bound into an INSERT. `None` binds as NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

pub trait Tabular: Sized {
    /// Default table name for this record type.
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];

    /// Row values in `COLUMNS` order.
    fn values(&self) -> Vec<SqlValue>;

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn create_table_sql(table: &str, columns: &[Column], if_not_exists: bool) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = format!("\"{}\" {}", c.name, c.sql_type.as_sql());
            if c.primary_key {
                def.push_str(" PRIMARY KEY");
            } else if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    format!(
        "CREATE TABLE {}\"{}\" ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        table,
        defs.join(", ")
    )
}

pub fn insert_sql(table: &str, columns: &[Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Serde adapter storing a list of strings as one JSON array cell, so list
/// fields survive both CSV and SQL untouched.
pub mod json_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(items).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map_err(serde::de::Error::custom)
    }

    pub fn encode(items: &[String]) -> String {
        serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
    }

    /// An empty cell decodes to an empty list.
    pub fn decode(raw: &str) -> Result<Vec<String>, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(raw)
    }
}

pub(crate) fn decode_error(e: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}
