use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decode_error, json_list, Column, SqlType, SqlValue, Tabular};

/// A movie as the catalog API reports it. Listing entries carry no money
/// figures; detail lookups fill `budget`, `revenue`, `genres` and `cast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    /// `YYYY-MM-DD` as delivered upstream.
    pub release_date: Option<String>,
    /// Original-language code.
    pub language: Option<String>,
    #[serde(with = "json_list")]
    pub genres: Vec<String>,
    #[serde(with = "json_list")]
    pub cast: Vec<String>,
}

impl MovieRecord {
    pub fn genre_rows(&self) -> Vec<GenreRow> {
        self.genres
            .iter()
            .map(|genre| GenreRow {
                movie_id: self.id,
                genre: genre.clone(),
            })
            .collect()
    }

    pub fn cast_rows(&self) -> Vec<CastRow> {
        self.cast
            .iter()
            .enumerate()
            .map(|(i, name)| CastRow {
                movie_id: self.id,
                name: name.clone(),
                billing_order: i as i64,
            })
            .collect()
    }
}

impl Tabular for MovieRecord {
    const TABLE: &'static str = "movies";
    const COLUMNS: &'static [Column] = &[
        Column::required("id", SqlType::Integer),
        Column::required("title", SqlType::Text),
        Column::nullable("budget", SqlType::Real),
        Column::nullable("revenue", SqlType::Real),
        Column::nullable("release_date", SqlType::Text),
        Column::nullable("language", SqlType::Text),
        Column::required("genres", SqlType::Text),
        Column::required("cast", SqlType::Text),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(Some(self.id)),
            SqlValue::Text(Some(self.title.clone())),
            SqlValue::Real(self.budget),
            SqlValue::Real(self.revenue),
            SqlValue::Text(self.release_date.clone()),
            SqlValue::Text(self.language.clone()),
            SqlValue::Text(Some(json_list::encode(&self.genres))),
            SqlValue::Text(Some(json_list::encode(&self.cast))),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let genres: String = row.try_get("genres")?;
        let cast: String = row.try_get("cast")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            budget: row.try_get("budget")?,
            revenue: row.try_get("revenue")?,
            release_date: row.try_get("release_date")?,
            language: row.try_get("language")?,
            genres: json_list::decode(&genres).map_err(decode_error)?,
            cast: json_list::decode(&cast).map_err(decode_error)?,
        })
    }
}

/// One genre of one movie, for joining genres against revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRow {
    pub movie_id: i64,
    pub genre: String,
}

impl Tabular for GenreRow {
    const TABLE: &'static str = "genres";
    const COLUMNS: &'static [Column] = &[
        Column::required("movie_id", SqlType::Integer),
        Column::required("genre", SqlType::Text),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(Some(self.movie_id)),
            SqlValue::Text(Some(self.genre.clone())),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            movie_id: row.try_get("movie_id")?,
            genre: row.try_get("genre")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastRow {
    pub movie_id: i64,
    pub name: String,
    pub billing_order: i64,
}

impl Tabular for CastRow {
    const TABLE: &'static str = "cast";
    const COLUMNS: &'static [Column] = &[
        Column::required("movie_id", SqlType::Integer),
        Column::required("name", SqlType::Text),
        Column::required("billing_order", SqlType::Integer),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(Some(self.movie_id)),
            SqlValue::Text(Some(self.name.clone())),
            SqlValue::Integer(Some(self.billing_order)),
        ]
    }

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            movie_id: row.try_get("movie_id")?,
            name: row.try_get("name")?,
            billing_order: row.try_get("billing_order")?,
        })
    }
}
