//! Fetch, normalize and persist the pipeline's source data.

pub mod countries;
pub mod economics;
pub mod movies;
pub mod normalize;
pub mod snapshot;
pub mod store;

pub use countries::CountryFetcher;
pub use economics::{EconomicFetcher, IncrementalReport};
pub use movies::MovieFetcher;
pub use snapshot::{load_csv_snapshot, save_csv_snapshot};
pub use store::{load_table, replace_table, StoreError};
