use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, WatchlistConfig};
use crate::paths::PathManager;

/// Values taken from the process environment. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub mongodb_uri: Option<String>,
    pub mongodb_password: Option<String>,
    pub dataset_basics: Option<String>,
    pub dataset_ratings: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            mongodb_uri: get("IAMDB_MONGODB_URI"),
            mongodb_password: get("IAMDB_MONGODB_PASSWORD"),
            dataset_basics: get("IAMDB_DATASET_BASICS"),
            dataset_ratings: get("IAMDB_DATASET_RATINGS"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedDataset {
    pub basics: String,
    pub ratings: Option<String>,
    pub title_types: Vec<String>,
    pub max_cache_age: Duration,
    pub cache_dir: PathBuf,
}

impl ResolvedDataset {
    /// Dataset locations and cache settings only; needs no credentials.
    pub fn resolve(config: &Config, env: &EnvOverrides, paths: &PathManager) -> Self {
        let ratings = env
            .dataset_ratings
            .clone()
            .or_else(|| config.dataset.ratings.clone())
            .filter(|location| !location.trim().is_empty());

        Self {
            basics: env
                .dataset_basics
                .clone()
                .unwrap_or_else(|| config.dataset.basics.clone()),
            ratings,
            title_types: config.dataset.title_types.clone(),
            max_cache_age: Duration::from_secs(config.dataset.max_cache_age_hours * 3600),
            cache_dir: paths.dataset_cache_dir(),
        }
    }
}

/// Everything a run needs, resolved once at startup from file, environment and secret store.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    pub dataset: ResolvedDataset,
    pub watchlist: WatchlistConfig,
    pub log_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// `password` is what the secret store or a prompt produced.
    /// The environment still takes precedence.
    pub fn resolve(
        config: &Config,
        env: &EnvOverrides,
        password: Option<String>,
        paths: &PathManager,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let mongodb_uri = match env.mongodb_uri.clone().or_else(|| config.remote.uri.clone()) {
            Some(uri) => uri,
            None => {
                let auth = if config.remote.no_auth {
                    String::new()
                } else {
                    let password = env
                        .mongodb_password
                        .clone()
                        .or(password)
                        .ok_or_else(|| {
                            anyhow::anyhow!(
                                "Could not resolve password for MongoDB user '{}'",
                                config.remote.user
                            )
                        })?;
                    format!(
                        "{}:{}@",
                        urlencoding::encode(&config.remote.user),
                        urlencoding::encode(&password)
                    )
                };
                let scheme = if config.remote.srv { "mongodb+srv" } else { "mongodb" };
                format!(
                    "{}://{}{}/{}?retryWrites=true",
                    scheme, auth, config.remote.server, config.remote.database
                )
            }
        };

        Ok(Self {
            mongodb_uri,
            database: config.remote.database.clone(),
            collection: config.remote.collection.clone(),
            dataset: ResolvedDataset::resolve(config, env, paths),
            watchlist: config.watchlist.clone(),
            log_file: config.logging.file.clone(),
        })
    }

    /// Connection string with the password replaced, for display and logs.
    pub fn redacted_uri(&self) -> String {
        redact_uri(&self.mongodb_uri)
    }
}

pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let Some((auth, host)) = rest.rsplit_once('@') else {
        return uri.to_string();
    };
    match auth.split_once(':') {
        Some((user, _)) => format!("{}://{}:****@{}", scheme, user, host),
        None => uri.to_string(),
    }
}
