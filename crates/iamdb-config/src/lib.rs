pub mod config;
pub mod credentials;
pub mod paths;
pub mod resolved;
pub mod secrets;

pub use config::{
    Config, DatasetConfig, LoggingConfig, RemoteConfig, WatchlistConfig, DEFAULT_BASICS_URL,
    DEFAULT_RATINGS_URL,
};
pub use credentials::CredentialStore;
pub use paths::{home_override, PathManager};
pub use resolved::{redact_uri, EnvOverrides, ResolvedConfig, ResolvedDataset};
pub use secrets::{PasswordStore, SecretBackend, SecretLocation, SystemKeyring, KEYRING_SERVICE};
