//! Relational side of the persistence layer.
//!
//! Loads are full-replace: the table is dropped, recreated from the record
//! type's column list and refilled inside one SQLite transaction, so readers
//! see either the old rows or the new ones. The incremental economic fetch
//! is the one caller that appends instead, through `insert_rows`.

use filmdata_core::models::{create_table_sql, insert_sql, is_valid_identifier, SqlValue, Tabular};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
}

fn checked(table: &str) -> Result<&str, StoreError> {
    if is_valid_identifier(table) {
        Ok(table)
    } else {
        Err(StoreError::InvalidTableName(table.to_string()))
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::Real(v) => query.bind(v),
    }
}

/// Discard everything in `table` and write `records` in its place.
/// Returns the number of rows written.
pub async fn replace_table<T: Tabular>(
    pool: &SqlitePool,
    table: &str,
    records: &[T],
) -> Result<usize, StoreError> {
    let table = checked(table)?;
    let insert = insert_sql(table, T::COLUMNS);

    let mut tx = pool.begin().await?;

    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&create_table_sql(table, T::COLUMNS, false))
        .execute(&mut *tx)
        .await?;

    for record in records {
        let mut query = sqlx::query(&insert);
        for value in record.values() {
            query = bind_value(query, value);
        }
        query.execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::info!(table = table, rows = records.len(), "Replaced table contents");
    Ok(records.len())
}

/// Read every row of `table`, in insertion order.
pub async fn load_table<T: Tabular>(pool: &SqlitePool, table: &str) -> Result<Vec<T>, StoreError> {
    let table = checked(table)?;
    let rows = sqlx::query(&format!("SELECT * FROM \"{}\" ORDER BY rowid", table))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| T::from_row(row).map_err(StoreError::from))
        .collect()
}

/// Create `table` from `T`'s columns if it is missing.
pub async fn ensure_table<T: Tabular>(pool: &SqlitePool, table: &str) -> Result<(), StoreError> {
    let table = checked(table)?;
    sqlx::query(&create_table_sql(table, T::COLUMNS, true))
        .execute(pool)
        .await?;
    Ok(())
}

/// Append rows without touching existing ones.
pub async fn insert_rows<T: Tabular>(
    pool: &SqlitePool,
    table: &str,
    records: &[T],
) -> Result<usize, StoreError> {
    let table = checked(table)?;
    let insert = insert_sql(table, T::COLUMNS);

    let mut tx = pool.begin().await?;
    for record in records {
        let mut query = sqlx::query(&insert);
        for value in record.values() {
            query = bind_value(query, value);
        }
        query.execute(&mut *tx).await?;
    }
    tx.commit().await?;

    Ok(records.len())
}

/// Distinct values of one text column, e.g. the ISO codes already stored.
pub async fn existing_keys(
    pool: &SqlitePool,
    table: &str,
    column: &str,
) -> Result<HashSet<String>, StoreError> {
    let table = checked(table)?;
    let column = checked(column)?;
    let keys: Vec<(String,)> = sqlx::query_as(&format!(
        "SELECT DISTINCT \"{}\" FROM \"{}\" WHERE \"{}\" IS NOT NULL",
        column, table, column
    ))
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(|k| k.0).collect())
}
