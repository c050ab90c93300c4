use std::{env, path::Path};

use log::info;

/// Credentials and endpoints of the publishing account.
#[derive(Debug, Clone, PartialEq)]
pub struct TwitterConfig {
    pub api_url: String,
    pub access_token: String,
    /// User that gets a direct message when a job fails.
    pub alert_recipient_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub duckdb_path: String,
    pub archive_dir: String,
    /// Server that renders the chart images.
    pub grafana_server: String,
    /// Public address of the dashboards linked from the posts.
    pub dashboard_url: String,
    pub twitter: TwitterConfig,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Every setting has a default, so this never fails.  A missing access
    /// token only shows up when publishing.
    pub fn from_env() -> Config {
        Config {
            duckdb_path: var_or("COVID_DUCKDB_PATH", "covid19.duckdb"),
            archive_dir: var_or("COVID_ARCHIVE_DIR", "covid19_data"),
            grafana_server: var_or("GRAFANA_SERVER", "http://localhost:3000"),
            dashboard_url: var_or("DASHBOARD_URL", "https://home.aitormagan.es"),
            twitter: TwitterConfig {
                api_url: var_or("TWITTER_API_URL", "https://api.twitter.com"),
                access_token: var_or("TWITTER_ACCESS_TOKEN", ""),
                alert_recipient_id: var_or("TWITTER_ALERT_RECIPIENT_ID", ""),
            },
        }
    }

    /// Read `.env/{env}.env` into the environment if it exists, then the
    /// configuration.
    pub fn load(env_name: &str) -> Result<Config, dotenvy::Error> {
        let path = format!(".env/{}.env", env_name);
        if Path::new(&path).exists() {
            dotenvy::from_path(Path::new(&path))?;
            info!("loaded environment from {}", path);
        }
        Ok(Config::from_env())
    }
}
