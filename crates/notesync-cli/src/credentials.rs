//! Account passwords kept in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;
use notesync_core::remote::{CredentialStore, Credentials, RemoteError, RemoteResult};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "notesync-cli";

/// `CredentialStore` backed by the platform keychain
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringCredentialStore;

fn entry_name(account_name: &str) -> String {
    format!("account:{account_name}")
}

impl KeyringCredentialStore {
    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(account_name: &str) -> RemoteResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &entry_name(account_name))
            .map_err(|error| RemoteError::CredentialStore(error.to_string()))
    }
}

fn encode(credentials: &Credentials) -> RemoteResult<String> {
    serde_json::to_string(&serde_json::json!({
        "username": credentials.username,
        "password": credentials.password,
    }))
    .map_err(RemoteError::from)
}

fn decode(raw: &str) -> RemoteResult<Credentials> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let field = |name: &str| {
        value
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RemoteError::CredentialStore(format!("stored credentials lack '{name}'"))
            })
    };
    Ok(Credentials::new(field("username")?, field("password")?))
}

impl CredentialStore for KeyringCredentialStore {
    #[cfg(not(test))]
    fn load(&self, account_name: &str) -> RemoteResult<Option<Credentials>> {
        match Self::entry(account_name)?.get_password() {
            Ok(raw) => decode(&raw).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(RemoteError::CredentialStore(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load(&self, account_name: &str) -> RemoteResult<Option<Credentials>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| RemoteError::CredentialStore(error.to_string()))?;
        guard
            .get(&entry_name(account_name))
            .map(|raw| decode(raw))
            .transpose()
    }

    #[cfg(not(test))]
    fn save(&self, account_name: &str, credentials: &Credentials) -> RemoteResult<()> {
        let raw = encode(credentials)?;
        Self::entry(account_name)?
            .set_password(&raw)
            .map_err(|error| RemoteError::CredentialStore(error.to_string()))
    }

    #[cfg(test)]
    fn save(&self, account_name: &str, credentials: &Credentials) -> RemoteResult<()> {
        let raw = encode(credentials)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| RemoteError::CredentialStore(error.to_string()))?;
        guard.insert(entry_name(account_name), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn delete(&self, account_name: &str) -> RemoteResult<()> {
        match Self::entry(account_name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(RemoteError::CredentialStore(error.to_string())),
        }
    }

    #[cfg(test)]
    fn delete(&self, account_name: &str) -> RemoteResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| RemoteError::CredentialStore(error.to_string()))?;
        guard.remove(&entry_name(account_name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_round_trip_through_store() {
        let store = KeyringCredentialStore;
        let name = "alice@cloud.example.com";
        store
            .save(name, &Credentials::new("alice", "app-password"))
            .unwrap();

        let loaded = store.load(name).unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.password, "app-password");

        store.delete(name).unwrap();
        assert!(store.load(name).unwrap().is_none());
        store.delete(name).unwrap();
    }

    #[test]
    fn corrupt_entries_are_reported() {
        assert!(matches!(
            decode(r#"{"username":"alice"}"#),
            Err(RemoteError::CredentialStore(_))
        ));
        assert!(decode("not json").is_err());
    }
}
