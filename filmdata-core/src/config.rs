use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilmConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub movies: MoviesConfig,
    #[serde(default)]
    pub economics: EconomicsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://database/film.db".to_string(),
            max_connections: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    /// Accept certificates that fail verification. Some upstreams serve
    /// broken chains on older machines.
    pub relaxed_tls: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 2,
            retry_delay_ms: 1000,
            relaxed_tls: false,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub geonames_url: String,
    pub tmdb_base_url: String,
    /// `FilmConfig::load` fills this from `TMDB_API_KEY` when unset.
    pub tmdb_api_key: Option<String>,
    pub world_bank_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            geonames_url: "http://api.geonames.org/countryInfoJSON?username=bullibulli".to_string(),
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_api_key: None,
            world_bank_base_url: "https://api.worldbank.org/v2".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MoviesConfig {
    pub top_pages: u32,
    pub bottom_pages: u32,
    pub min_votes: u32,
    pub cast_limit: usize,
}

impl Default for MoviesConfig {
    fn default() -> Self {
        Self {
            top_pages: 3,
            bottom_pages: 3,
            min_votes: 10,
            cast_limit: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EconomicsConfig {
    /// Year requested from the bulk all-countries endpoint.
    pub target_year: i32,
    /// Year matched by the per-country incremental fetch.
    pub incremental_year: i32,
    pub gdp_indicator: String,
    pub population_indicator: String,
    pub per_page: u32,
    pub request_delay_ms: u64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            target_year: 2022,
            incremental_year: 2023,
            gdp_indicator: "NY.GDP.MKTP.CD".to_string(),
            population_indicator: "SP.POP.TOTL".to_string(),
            per_page: 400,
            request_delay_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub artifact_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            artifact_path: PathBuf::from("ml/hit_predictor.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    /// Revenue-to-budget ratios tried in order until one yields both classes.
    pub thresholds: Vec<f64>,
    pub test_fraction: f64,
    pub seed: u64,
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Inverse regularization strength.
    pub regularization: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![2.0, 1.5, 1.0, 0.8],
            test_fraction: 0.2,
            seed: 42,
            learning_rate: 0.5,
            max_iterations: 5000,
            tolerance: 1e-6,
            regularization: 1.0,
        }
    }
}

impl FilmConfig {
    /// Load from an optional TOML file, then `FILMDATA__SECTION__KEY` env overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FILMDATA").separator("__"))
            .build()?;
        let mut config: Self = s.try_deserialize()?;

        let configured = config
            .sources
            .tmdb_api_key
            .take()
            .filter(|k| !k.trim().is_empty());
        config.sources.tmdb_api_key =
            configured.or_else(|| std::env::var("TMDB_API_KEY").ok().filter(|k| !k.trim().is_empty()));

        Ok(config)
    }
}
