pub mod config;
pub mod countries;
pub mod db;
pub mod error;
pub mod http;
pub mod languages;
pub mod models;

pub use config::FilmConfig;
pub use error::{FilmError, MalformedRecord};
pub use http::{FetchError, HttpClient, ReqwestTransport, RetryPolicy, Transport};
pub use models::{
    CountryLanguageRecord, EconomicRecord, MovieRecord, Tabular, TrainedClassifierArtifact,
};
