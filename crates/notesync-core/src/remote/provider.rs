//! Per-account client construction and caching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::capabilities::{fetch_capabilities, CapabilitiesOutcome};
use super::client::{HttpTransport, NotesApi, NotesClient};
use super::credentials::CredentialStore;
use super::error::{RemoteError, RemoteResult};
use crate::config::HttpTimeouts;
use crate::models::{Account, ApiVersion};

/// Hands out authenticated clients for accounts
#[async_trait]
pub trait NotesApiProvider: Send + Sync {
    /// Client speaking the account's preferred protocol version
    fn notes_api(&self, account: &Account) -> RemoteResult<Arc<dyn NotesApi>>;

    /// Drop any cached session of the account, e.g. after credentials were rejected
    fn invalidate(&self, account: &Account);

    async fn fetch_capabilities(&self, account: &Account) -> RemoteResult<CapabilitiesOutcome>;
}

struct CachedClient {
    api_version: Option<ApiVersion>,
    client: Arc<NotesClient>,
}

/// `NotesApiProvider` backed by reqwest, caching one client per account
pub struct HttpNotesApiProvider {
    credentials: Arc<dyn CredentialStore>,
    timeouts: HttpTimeouts,
    cache: Mutex<HashMap<String, CachedClient>>,
}

impl HttpNotesApiProvider {
    pub fn new(credentials: Arc<dyn CredentialStore>, timeouts: HttpTimeouts) -> Self {
        Self {
            credentials,
            timeouts,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn transport(&self, account: &Account) -> RemoteResult<HttpTransport> {
        let credentials = self
            .credentials
            .load(&account.account_name)?
            .ok_or_else(|| RemoteError::MissingCredentials(account.account_name.clone()))?;
        HttpTransport::new(&account.url, credentials, self.timeouts)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedClient>> {
        // A poisoned cache only holds clients; keep using it
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl NotesApiProvider for HttpNotesApiProvider {
    fn notes_api(&self, account: &Account) -> RemoteResult<Arc<dyn NotesApi>> {
        let preferred = account.preferred_api_version();
        if let Some(cached) = self.cache().get(&account.account_name) {
            if cached.api_version == preferred {
                return Ok(cached.client.clone());
            }
        }

        let client = Arc::new(NotesClient::new(self.transport(account)?, preferred));
        self.cache().insert(
            account.account_name.clone(),
            CachedClient {
                api_version: preferred,
                client: client.clone(),
            },
        );
        Ok(client)
    }

    fn invalidate(&self, account: &Account) {
        if self.cache().remove(&account.account_name).is_some() {
            tracing::info!("Dropped cached session of {}", account.account_name);
        }
    }

    async fn fetch_capabilities(&self, account: &Account) -> RemoteResult<CapabilitiesOutcome> {
        let transport = self.transport(account)?;
        fetch_capabilities(&transport, account.capabilities_etag.as_deref()).await
    }
}
