use crate::output::Output;
use color_eyre::Result;
use iamdb_config::{
    Config, CredentialStore, EnvOverrides, PasswordStore, PathManager, ResolvedConfig,
    ResolvedDataset, SecretBackend, SystemKeyring,
};
use iamdb_core::MongoStore;
use iamdb_sources::{DatasetFetcher, DatasetReader, Location};
use std::path::PathBuf;
use tracing::{debug, info};

use progress::Progress;

pub mod check;
pub mod clear;
pub mod config;
pub mod progress;
pub mod prompts;
pub mod sync;

/// Where this run reads configuration and keeps its state.
pub struct Workspace {
    paths: PathManager,
    config_file: PathBuf,
    keyring: Box<dyn SecretBackend>,
}

impl Workspace {
    pub fn new(paths: PathManager, config_file: PathBuf) -> Self {
        Self {
            paths,
            config_file,
            keyring: Box::new(SystemKeyring::new()),
        }
    }

    pub fn with_keyring(mut self, keyring: Box<dyn SecretBackend>) -> Self {
        self.keyring = keyring;
        self
    }

    pub fn paths(&self) -> &PathManager {
        &self.paths
    }

    pub fn config_file(&self) -> &PathBuf {
        &self.config_file
    }

    fn credential_store(&self) -> Result<CredentialStore> {
        let credentials_file = self.paths.credentials_file();
        let mut store = CredentialStore::new(credentials_file.clone());
        store.load().map_err(|e| {
            color_eyre::eyre::eyre!(
                "Failed to load credentials from {}: {}",
                credentials_file.display(),
                e
            )
        })?;
        Ok(store)
    }

    /// Keyring-backed password store, with the credentials file as fallback.
    pub fn password_store(&self) -> Result<PasswordStore<'_>> {
        Ok(PasswordStore::new(self.keyring.as_ref(), self.credential_store()?))
    }

    /// Save a password, creating the config directories first in case it lands in the file.
    pub fn save_password(&self, user: &str, password: String) -> Result<String> {
        self.paths.ensure_directories().map_err(|e| {
            color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e)
        })?;
        let location = self
            .password_store()?
            .set(user, password)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to save password: {}", e))?;
        Ok(location.to_string())
    }

    /// Log file from the config, if one is set.
    /// Read before logging starts, so errors are ignored here.
    pub fn log_file(&self) -> Option<PathBuf> {
        Config::load_from_file(&self.config_file)
            .ok()
            .and_then(|config| config.logging.file)
    }

    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load_config(&self, output: &Output) -> Result<Config> {
        if !self.config_file.exists() {
            output.warn(format!(
                "Configuration file not found at {}, using defaults. \
                 Run 'iamdb config init' to create one.",
                self.config_file.display()
            ));
            return Ok(Config::default());
        }

        let config = Config::load_from_file(&self.config_file).map_err(|e| {
            color_eyre::eyre::eyre!(
                "Failed to load config from {}: {}",
                self.config_file.display(),
                e
            )
        })?;
        config
            .validate()
            .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;
        debug!("Loaded configuration from {}", self.config_file.display());
        Ok(config)
    }

    pub fn resolve_dataset(&self, config: &Config) -> ResolvedDataset {
        ResolvedDataset::resolve(config, &EnvOverrides::from_env(), &self.paths)
    }

    /// Resolve the full run configuration, finding the database password in the
    /// environment, then the keyring or credentials file, then by prompting
    /// (and saving the answer).
    pub fn resolve(&self, config: &Config, output: &Output) -> Result<ResolvedConfig> {
        let env = EnvOverrides::from_env();

        let password = if config.needs_password()
            && env.mongodb_uri.is_none()
            && env.mongodb_password.is_none()
        {
            self.stored_or_prompted_password(config, output)?
        } else {
            None
        };

        let resolved = ResolvedConfig::resolve(config, &env, password, &self.paths)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to resolve configuration: {}", e))?;
        debug!(uri = %resolved.redacted_uri(), "Resolved database connection");
        Ok(resolved)
    }

    fn stored_or_prompted_password(
        &self,
        config: &Config,
        output: &Output,
    ) -> Result<Option<String>> {
        let user = &config.remote.user;
        if let Some(password) = self.password_store()?.get(user) {
            debug!("Using stored password for MongoDB user '{}'", user);
            return Ok(Some(password));
        }

        if !progress::is_interactive() {
            return Ok(None);
        }

        let password = prompts::prompt_password(&format!(
            "MongoDB password for {}@{}",
            user, config.remote.server
        ))?;
        let location = self.save_password(user, password.clone())?;
        output.success(format!("Saved password for '{}' to {}", user, location));
        Ok(Some(password))
    }
}

/// Download (or reuse) the dataset snapshot and open it as a record stream.
pub async fn open_dataset(
    dataset: &ResolvedDataset,
    refresh: bool,
    progress: &Progress,
) -> Result<DatasetReader> {
    let basics = Location::parse(&dataset.basics);
    let ratings = dataset.ratings.as_deref().map(Location::parse);

    progress.set_message(format!("Fetching dataset from {}", basics));
    let reader = DatasetFetcher::from_config(dataset)
        .with_refresh(refresh)
        .fetch(&basics, ratings.as_ref())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to fetch dataset: {}", e))?;
    Ok(reader)
}

pub async fn connect_store(resolved: &ResolvedConfig) -> Result<MongoStore> {
    info!("Connecting to {}", resolved.redacted_uri());
    MongoStore::connect(&resolved.mongodb_uri, &resolved.database, &resolved.collection)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to connect to MongoDB: {}", e))
}
