pub mod prod_db;
pub mod timeseries;

use thiserror::Error;

use crate::geography::GeographyError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
    /// A region name in the store that is not in the registry.
    #[error(transparent)]
    UnknownRegion(#[from] GeographyError),
}
