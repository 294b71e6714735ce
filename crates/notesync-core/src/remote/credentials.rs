//! Account credentials and where they are kept.

use std::collections::HashMap;
use std::sync::Mutex;

use super::error::{RemoteError, RemoteResult};

/// Login name and app password of one account
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Secure storage for credentials, keyed by account name
pub trait CredentialStore: Send + Sync {
    fn load(&self, account_name: &str) -> RemoteResult<Option<Credentials>>;

    fn save(&self, account_name: &str, credentials: &Credentials) -> RemoteResult<()>;

    /// Forget the credentials; deleting missing credentials is not an error
    fn delete(&self, account_name: &str) -> RemoteResult<()>;
}

/// Process-local credential store
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<String, Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> RemoteResult<std::sync::MutexGuard<'_, HashMap<String, Credentials>>> {
        self.entries
            .lock()
            .map_err(|_| RemoteError::CredentialStore("credential store poisoned".to_string()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self, account_name: &str) -> RemoteResult<Option<Credentials>> {
        Ok(self.entries()?.get(account_name).cloned())
    }

    fn save(&self, account_name: &str, credentials: &Credentials) -> RemoteResult<()> {
        self.entries()?
            .insert(account_name.to_string(), credentials.clone());
        Ok(())
    }

    fn delete(&self, account_name: &str) -> RemoteResult<()> {
        self.entries()?.remove(account_name);
        Ok(())
    }
}
