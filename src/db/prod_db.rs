use crate::config::Config;
use crate::sources::csv_feed::CsvFeedArchive;

use super::{timeseries::DuckDbStore, StoreError};

pub struct ProdDb {}

impl ProdDb {
    pub fn covid19(config: &Config) -> Result<DuckDbStore, StoreError> {
        DuckDbStore::open(&config.duckdb_path)
    }

    pub fn isciii_feed(config: &Config) -> CsvFeedArchive {
        CsvFeedArchive {
            base_dir: format!("{}/Isciii/Agregados", config.archive_dir),
        }
    }
}
