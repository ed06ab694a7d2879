//! Pipeline steps
//!
//! Each step is callable on its own (one CLI subcommand each) and
//! `run_all` chains them in order. Fetch steps write a CSV snapshot under
//! `paths.data_dir`; `load_snapshots` moves snapshots into SQLite.
//! Upstream failures never abort a step, local IO and database failures do.

use filmdata_core::config::FilmConfig;
use filmdata_core::countries::ALPHA3_CODES;
use filmdata_core::models::{
    CastRow, CountryLanguageRecord, EconomicRecord, GenreRow, MovieRecord, Tabular,
    TrainedClassifierArtifact,
};
use filmdata_core::{db, FetchError, FilmError, HttpClient};
use filmdata_ingest::snapshot::{GDP_CACHE_CSV, LANGUAGE_MARKET_CSV, MOVIES_CSV, WORLD_BANK_CSV};
use filmdata_ingest::{
    load_csv_snapshot, load_table, replace_table, save_csv_snapshot, CountryFetcher,
    EconomicFetcher, IncrementalReport, MovieFetcher, StoreError,
};
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use std::path::PathBuf;
use thiserror::Error;

use crate::subsystems::artifact::save_artifact;
use crate::subsystems::train::{train, TrainingError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Training failed: {0}")]
    Training(#[from] TrainingError),
}

/// Row counts written by `load_snapshots`. `None` means the snapshot file
/// was absent and the table was left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub movies: Option<usize>,
    pub genres: Option<usize>,
    pub cast: Option<usize>,
    pub language_market: Option<usize>,
    pub world_bank_data: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave out the per-country economic gap fill (hundreds of requests).
    pub skip_incremental: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub countries: usize,
    pub economies: usize,
    pub movies: usize,
    pub loaded: LoadReport,
    pub incremental: Option<IncrementalReport>,
    pub artifact: TrainedClassifierArtifact,
}

/// Shared handles for every step.
pub struct PipelineContext {
    pub config: FilmConfig,
    pub pool: SqlitePool,
    pub client: HttpClient,
}

impl PipelineContext {
    pub fn new(config: FilmConfig, pool: SqlitePool, client: HttpClient) -> Self {
        Self {
            config,
            pool,
            client,
        }
    }

    /// Open the configured database and build the HTTP client.
    pub async fn connect(config: FilmConfig) -> Result<Self, FilmError> {
        let pool = db::create_pool(&config.database).await?;
        let client = HttpClient::new(&config.http)?;
        Ok(Self::new(config, pool, client))
    }

    pub fn data_path(&self, file: &str) -> PathBuf {
        self.config.paths.data_dir.join(file)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.config.paths.artifact_path.clone()
    }

    pub async fn init_db(&self) -> Result<(), PipelineError> {
        db::init_schema(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_countries(&self) -> Result<Vec<CountryLanguageRecord>, PipelineError> {
        let fetcher = CountryFetcher::new(self.client.clone(), &self.config.sources.geonames_url);

        match fetcher.fetch().await {
            Ok(records) if records.is_empty() => {
                tracing::error!("Country directory yielded no records, snapshot left as is");
                Ok(records)
            }
            Ok(records) => {
                save_csv_snapshot(&self.data_path(LANGUAGE_MARKET_CSV), &records)?;
                Ok(records)
            }
            Err(e) => {
                tracing::error!(error = %e, "Country fetch failed, snapshot left as is");
                Ok(Vec::new())
            }
        }
    }

    pub async fn fetch_economics(&self) -> Result<Vec<EconomicRecord>, PipelineError> {
        let records: Vec<EconomicRecord> = self
            .economic_fetcher()
            .fetch_all()
            .await
            .into_values()
            .collect();

        if records.is_empty() {
            tracing::error!("No economic data fetched, snapshot left as is");
            return Ok(records);
        }

        save_csv_snapshot(&self.data_path(WORLD_BANK_CSV), &records)?;
        Ok(records)
    }

    /// Per-country fill of `world_bank_data` for every known alpha-3 code
    /// not present yet. Appends; never replaces.
    pub async fn fetch_economics_incremental(&self) -> Result<IncrementalReport, PipelineError> {
        let cache = self.data_path(GDP_CACHE_CSV);
        let report = self
            .economic_fetcher()
            .run_incremental(&self.pool, ALPHA3_CODES, Some(cache.as_path()))
            .await?;
        Ok(report)
    }

    pub async fn fetch_movies(&self) -> Result<Vec<MovieRecord>, PipelineError> {
        let fetcher = match MovieFetcher::new(
            self.client.clone(),
            &self.config.sources.tmdb_base_url,
            self.config.sources.tmdb_api_key.clone(),
            self.config.movies.clone(),
        ) {
            Ok(fetcher) => fetcher,
            Err(FetchError::MissingApiKey) => {
                tracing::warn!("No TMDB API key configured, skipping movie fetch");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(error = %e, "Movie fetcher unavailable");
                return Ok(Vec::new());
            }
        };

        let movies = fetcher.fetch_catalog().await;
        if movies.is_empty() {
            tracing::error!("No movies fetched, snapshot left as is");
            return Ok(movies);
        }

        save_csv_snapshot(&self.data_path(MOVIES_CSV), &movies)?;
        Ok(movies)
    }

    /// Replace every table from its snapshot. A missing snapshot skips its
    /// tables; `genres` and `cast` are derived from the movie snapshot.
    pub async fn load_snapshots(&self) -> Result<LoadReport, PipelineError> {
        let mut report = LoadReport::default();

        if let Some(movies) = self.read_snapshot::<MovieRecord>(MOVIES_CSV)? {
            let genres: Vec<GenreRow> = movies.iter().flat_map(MovieRecord::genre_rows).collect();
            let cast: Vec<CastRow> = movies.iter().flat_map(MovieRecord::cast_rows).collect();

            report.movies = Some(replace_table(&self.pool, MovieRecord::TABLE, &movies).await?);
            report.genres = Some(replace_table(&self.pool, GenreRow::TABLE, &genres).await?);
            report.cast = Some(replace_table(&self.pool, CastRow::TABLE, &cast).await?);
        }

        if let Some(records) = self.read_snapshot::<CountryLanguageRecord>(LANGUAGE_MARKET_CSV)? {
            report.language_market =
                Some(replace_table(&self.pool, CountryLanguageRecord::TABLE, &records).await?);
        }

        if let Some(records) = self.read_snapshot::<EconomicRecord>(WORLD_BANK_CSV)? {
            report.world_bank_data =
                Some(replace_table(&self.pool, EconomicRecord::TABLE, &records).await?);
        }

        tracing::info!(?report, "Snapshots loaded");
        Ok(report)
    }

    /// Train on the `movies` table and write the artifact.
    pub async fn train_model(&self) -> Result<TrainedClassifierArtifact, PipelineError> {
        let movies = load_table::<MovieRecord>(&self.pool, MovieRecord::TABLE)
            .await
            .map_err(TrainingError::from)?;

        let artifact = train(&movies, &self.config.training)?;
        save_artifact(&artifact, &self.artifact_path()).map_err(TrainingError::from)?;
        Ok(artifact)
    }

    pub async fn run_all(&self, options: RunOptions) -> Result<RunSummary, PipelineError> {
        tracing::info!("Step 1/7: init database");
        self.init_db().await?;

        tracing::info!("Step 2/7: countries");
        let countries = self.fetch_countries().await?.len();

        tracing::info!("Step 3/7: economics");
        let economies = self.fetch_economics().await?.len();

        tracing::info!("Step 4/7: movies");
        let movies = self.fetch_movies().await?.len();

        tracing::info!("Step 5/7: load snapshots");
        let loaded = self.load_snapshots().await?;

        let incremental = if options.skip_incremental {
            tracing::info!("Step 6/7: incremental economics skipped");
            None
        } else {
            tracing::info!("Step 6/7: incremental economics");
            Some(self.fetch_economics_incremental().await?)
        };

        tracing::info!("Step 7/7: train");
        let artifact = self.train_model().await?;

        Ok(RunSummary {
            countries,
            economies,
            movies,
            loaded,
            incremental,
            artifact,
        })
    }

    fn economic_fetcher(&self) -> EconomicFetcher {
        EconomicFetcher::new(
            self.client.clone(),
            &self.config.sources.world_bank_base_url,
            self.config.economics.clone(),
        )
    }

    fn read_snapshot<T: DeserializeOwned>(&self, file: &str) -> Result<Option<Vec<T>>, StoreError> {
        let path = self.data_path(file);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Snapshot missing, table not loaded");
            return Ok(None);
        }
        load_csv_snapshot(&path).map(Some)
    }
}
