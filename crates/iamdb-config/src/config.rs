use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BASICS_URL: &str = "https://datasets.imdbws.com/title.basics.tsv.gz";
pub const DEFAULT_RATINGS_URL: &str = "https://datasets.imdbws.com/title.ratings.tsv.gz";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub watchlist: WatchlistConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatasetConfig {
    /// URL or local path of the title basics TSV (optionally gzipped)
    #[serde(default = "default_basics")]
    pub basics: String,
    /// URL or local path of the title ratings TSV; ratings are skipped when unset
    #[serde(default = "default_ratings", skip_serializing_if = "Option::is_none")]
    pub ratings: Option<String>,
    #[serde(default = "default_title_types")]
    pub title_types: Vec<String>,
    #[serde(default = "default_max_cache_age_hours")]
    pub max_cache_age_hours: u64,
}

/// Where the user's own viewing log comes from. Sources are read in this order.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WatchlistConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(default)]
    pub movie_dirs: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub no_auth: bool,
    /// Use the `mongodb+srv://` scheme (hosted clusters)
    #[serde(default = "default_true")]
    pub srv: bool,
    /// Full connection string; when set, server/user/srv are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_basics() -> String {
    DEFAULT_BASICS_URL.to_string()
}

fn default_ratings() -> Option<String> {
    Some(DEFAULT_RATINGS_URL.to_string())
}

fn default_title_types() -> Vec<String> {
    vec!["movie".to_string(), "tvMovie".to_string()]
}

fn default_max_cache_age_hours() -> u64 {
    24
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "iamdb".to_string()
}

fn default_database() -> String {
    "iamdb".to_string()
}

fn default_collection() -> String {
    "movies".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            basics: default_basics(),
            ratings: default_ratings(),
            title_types: default_title_types(),
            max_cache_age_hours: default_max_cache_age_hours(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            user: default_user(),
            database: default_database(),
            collection: default_collection(),
            no_auth: false,
            srv: default_true(),
            uri: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dataset.basics.trim().is_empty() {
            return Err(anyhow::anyhow!("dataset.basics cannot be empty"));
        }

        if self.remote.uri.is_none() && self.remote.server.trim().is_empty() {
            return Err(anyhow::anyhow!("remote.server cannot be empty"));
        }
        if self.remote.database.trim().is_empty() {
            return Err(anyhow::anyhow!("remote.database cannot be empty"));
        }
        if self.remote.collection.trim().is_empty() {
            return Err(anyhow::anyhow!("remote.collection cannot be empty"));
        }

        Ok(())
    }

    /// `sync` needs a watch list; `check` does not.
    pub fn validate_watchlist(&self) -> anyhow::Result<()> {
        if self.watchlist.csv.is_none() && self.watchlist.movie_dirs.is_empty() {
            return Err(anyhow::anyhow!(
                "No watch list configured: set [watchlist] csv or movie_dirs"
            ));
        }
        Ok(())
    }

    /// Whether a password must be resolved before connecting
    pub fn needs_password(&self) -> bool {
        self.remote.uri.is_none() && !self.remote.no_auth
    }
}
