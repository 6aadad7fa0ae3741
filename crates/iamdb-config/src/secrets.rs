use crate::credentials::CredentialStore;
use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Service name the database passwords are filed under in the system keyring.
pub const KEYRING_SERVICE: &str = "iamdb";

/// A secret store keyed by database user.
pub trait SecretBackend {
    fn name(&self) -> &str;
    fn get(&self, user: &str) -> Result<Option<String>>;
    fn set(&self, user: &str, password: &str) -> Result<()>;
    /// Returns whether there was anything to delete.
    fn delete(&self, user: &str) -> Result<bool>;
}

/// The platform keyring (Secret Service, Keychain, Credential Manager).
pub struct SystemKeyring {
    service: String,
}

impl SystemKeyring {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, user: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, user)
            .map_err(|e| anyhow!("Cannot open keyring entry {}/{}: {}", self.service, user, e))
    }
}

impl Default for SystemKeyring {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for SystemKeyring {
    fn name(&self) -> &str {
        "system keyring"
    }

    fn get(&self, user: &str) -> Result<Option<String>> {
        match self.entry(user)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!("Keyring lookup failed: {}", e)),
        }
    }

    fn set(&self, user: &str, password: &str) -> Result<()> {
        self.entry(user)?
            .set_password(password)
            .map_err(|e| anyhow!("Keyring update failed: {}", e))
    }

    fn delete(&self, user: &str) -> Result<bool> {
        match self.entry(user)?.delete_password() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(anyhow!("Keyring delete failed: {}", e)),
        }
    }
}

/// Where a saved password ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretLocation {
    Keyring,
    File(PathBuf),
}

impl fmt::Display for SecretLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretLocation::Keyring => write!(f, "the system keyring"),
            SecretLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Database passwords, kept in the keyring.
///
/// The credentials file is used instead when the keyring backend is
/// unavailable, and is still read for passwords saved there earlier.
pub struct PasswordStore<'a> {
    keyring: &'a dyn SecretBackend,
    file: CredentialStore,
}

impl<'a> PasswordStore<'a> {
    pub fn new(keyring: &'a dyn SecretBackend, file: CredentialStore) -> Self {
        Self { keyring, file }
    }

    pub fn file(&self) -> &CredentialStore {
        &self.file
    }

    pub fn get(&self, user: &str) -> Option<String> {
        match self.keyring.get(user) {
            Ok(Some(password)) => {
                debug!("Found password for '{}' in {}", user, self.keyring.name());
                return Some(password);
            }
            Ok(None) => {}
            Err(e) => warn!("{} unavailable, reading credentials file: {}", self.keyring.name(), e),
        }
        self.file.get_mongodb_password(user).cloned()
    }

    pub fn set(&mut self, user: &str, password: String) -> Result<SecretLocation> {
        match self.keyring.set(user, &password) {
            Ok(()) => Ok(SecretLocation::Keyring),
            Err(e) => {
                warn!("{} unavailable, writing credentials file: {}", self.keyring.name(), e);
                self.file.set_mongodb_password(user, password);
                self.file.save()?;
                Ok(SecretLocation::File(self.file.path().clone()))
            }
        }
    }

    /// Remove the user's keyring entry. The credentials file is left alone.
    pub fn delete_from_keyring(&self, user: &str) -> Result<bool> {
        self.keyring.delete(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct NoBackend;

    impl SecretBackend for NoBackend {
        fn name(&self) -> &str {
            "test keyring"
        }
        fn get(&self, _user: &str) -> Result<Option<String>> {
            Err(anyhow!("no secret service"))
        }
        fn set(&self, _user: &str, _password: &str) -> Result<()> {
            Err(anyhow!("no secret service"))
        }
        fn delete(&self, _user: &str) -> Result<bool> {
            Err(anyhow!("no secret service"))
        }
    }

    #[derive(Default)]
    struct MemoryKeyring(RefCell<HashMap<String, String>>);

    impl SecretBackend for MemoryKeyring {
        fn name(&self) -> &str {
            "test keyring"
        }
        fn get(&self, user: &str) -> Result<Option<String>> {
            Ok(self.0.borrow().get(user).cloned())
        }
        fn set(&self, user: &str, password: &str) -> Result<()> {
            self.0.borrow_mut().insert(user.to_string(), password.to_string());
            Ok(())
        }
        fn delete(&self, user: &str) -> Result<bool> {
            Ok(self.0.borrow_mut().remove(user).is_some())
        }
    }

    #[test]
    fn test_missing_backend_falls_back_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        let mut store = PasswordStore::new(&NoBackend, CredentialStore::new(path.clone()));
        let location = store.set("iamdb", "hunter2".to_string()).unwrap();
        assert_eq!(location, SecretLocation::File(path.clone()));
        assert!(path.exists());

        let mut file = CredentialStore::new(path);
        file.load().unwrap();
        let reopened = PasswordStore::new(&NoBackend, file);
        assert_eq!(reopened.get("iamdb").as_deref(), Some("hunter2"));
        assert_eq!(reopened.get("someone-else"), None);
    }

    #[test]
    fn test_keyring_is_preferred_when_available() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        let keyring = MemoryKeyring::default();

        let mut store = PasswordStore::new(&keyring, CredentialStore::new(path.clone()));
        let location = store.set("iamdb", "hunter2".to_string()).unwrap();
        assert_eq!(location, SecretLocation::Keyring);
        assert!(!path.exists());
        assert_eq!(store.get("iamdb").as_deref(), Some("hunter2"));

        assert!(store.delete_from_keyring("iamdb").unwrap());
        assert_eq!(store.get("iamdb"), None);
    }

    #[test]
    fn test_file_password_found_when_keyring_has_none() {
        let keyring = MemoryKeyring::default();
        let mut file = CredentialStore::new(PathBuf::from("/nonexistent/credentials.toml"));
        file.set_mongodb_password("iamdb", "from-file".to_string());

        let store = PasswordStore::new(&keyring, file);
        assert_eq!(store.get("iamdb").as_deref(), Some("from-file"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(SecretLocation::Keyring.to_string(), "the system keyring");
        let file = SecretLocation::File(PathBuf::from("/tmp/credentials.toml"));
        assert_eq!(file.to_string(), "/tmp/credentials.toml");
    }
}
