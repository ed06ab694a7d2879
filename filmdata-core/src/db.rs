use crate::config::DatabaseConfig;
use crate::models::{
    create_table_sql, CastRow, CountryLanguageRecord, EconomicRecord, GenreRow, MovieRecord,
    Tabular,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
}

/// Single-connection in-memory database. Every connection to `:memory:`
/// is a separate database, so the pool must never open a second one.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
}

pub async fn health_check(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT sqlite_version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Create every pipeline table that does not exist yet. Existing tables and
/// their rows are left alone.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        create_table_sql(MovieRecord::TABLE, MovieRecord::COLUMNS, true),
        create_table_sql(GenreRow::TABLE, GenreRow::COLUMNS, true),
        create_table_sql(CastRow::TABLE, CastRow::COLUMNS, true),
        create_table_sql(
            CountryLanguageRecord::TABLE,
            CountryLanguageRecord::COLUMNS,
            true,
        ),
        create_table_sql(EconomicRecord::TABLE, EconomicRecord::COLUMNS, true),
    ];

    let mut tx = pool.begin().await?;
    for sql in &statements {
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(tables = statements.len(), "Schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_repeatable() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();

        assert_eq!(
            names,
            vec!["cast", "genres", "language_market", "movies", "world_bank_data"]
        );
    }

    #[tokio::test]
    async fn test_health_check_reports_version() {
        let pool = create_memory_pool().await.unwrap();
        let version = health_check(&pool).await.unwrap();
        assert!(version.starts_with('3'));
    }
}
