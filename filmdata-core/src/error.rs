use thiserror::Error;

use crate::http::FetchError;

#[derive(Error, Debug)]
pub enum FilmError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// One upstream entry that could not be turned into a record.
///
/// Never fatal: the fetcher logs it and moves on to the next entry.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Malformed record: {reason}")]
pub struct MalformedRecord {
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
