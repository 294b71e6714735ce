//! User-facing note and account actions.
//!
//! Every mutation commits locally first, tells the change hook, and then asks
//! the coordinator for a push-only round so the edit reaches the server as
//! soon as the network allows.

use std::sync::Arc;

use tokio::runtime::Handle;

use super::store::NotesStore;
use crate::error::{Error, Result};
use crate::models::text::generate_note_title;
use crate::models::{
    Account, AccountId, CategorySortingMethod, NavigationCategory, NewAccount, Note, NoteDraft,
    NoteId, NoteOrigin,
};
use crate::notify::ChangeNotifier;
use crate::remote::{CapabilitiesOutcome, NotesApiProvider};
use crate::sync::{NetworkStatus, SyncCoordinator, SyncHandle};
use crate::util::is_http_url;

/// Facade combining the local store with the sync coordinator
#[derive(Clone)]
pub struct NotesService {
    store: NotesStore,
    coordinator: SyncCoordinator,
    provider: Arc<dyn NotesApiProvider>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl NotesService {
    pub fn new(
        store: NotesStore,
        provider: Arc<dyn NotesApiProvider>,
        notifier: Arc<dyn ChangeNotifier>,
        network: NetworkStatus,
        runtime: Handle,
    ) -> Self {
        let coordinator = SyncCoordinator::new(
            store.clone(),
            provider.clone(),
            notifier.clone(),
            network,
            runtime,
        );
        Self {
            store,
            coordinator,
            provider,
            notifier,
        }
    }

    pub const fn store(&self) -> &NotesStore {
        &self.store
    }

    pub const fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    async fn require_note(&self, id: NoteId) -> Result<Note> {
        self.store
            .get_note(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    async fn require_account(&self, id: AccountId) -> Result<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    /// Notify and push after a local write; `None` when no row changed.
    fn local_change(&self, account_id: AccountId, rows: usize) -> Option<SyncHandle> {
        if rows == 0 {
            return None;
        }
        self.notifier.notes_changed(account_id);
        Some(self.coordinator.request_sync(account_id, true))
    }

    // Accounts

    /// Create an account and request its first full sync.
    ///
    /// Credentials must already be in the provider's credential store. When
    /// online, capabilities are fetched first so the sync already speaks the
    /// best API version; failing to fetch them does not fail the import.
    pub async fn add_account(&self, account: &NewAccount) -> Result<(Account, SyncHandle)> {
        if !is_http_url(&account.url) {
            return Err(Error::InvalidInput(format!(
                "server URL must start with http:// or https://: {}",
                account.url
            )));
        }
        if account.username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }

        let mut account = self.store.create_account(account).await?;
        tracing::info!("Added account {}", account.account_name);
        if self.coordinator.is_sync_possible() {
            match self.refresh_capabilities(account.id).await {
                Ok(true) => account = self.require_account(account.id).await?,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        "Could not fetch capabilities of {}: {error}",
                        account.account_name
                    );
                }
            }
        }
        if self.coordinator.current_account().is_none() {
            self.coordinator.set_current_account(Some(account.id));
        }
        let handle = self.coordinator.request_sync(account.id, false);
        Ok((account, handle))
    }

    /// Remove an account with all of its notes; queued syncs are dropped.
    pub async fn remove_account(&self, id: AccountId) -> Result<()> {
        let account = self.require_account(id).await?;
        self.store.delete_account(id).await?;
        self.coordinator.forget_account(id);
        self.provider.invalidate(&account);
        tracing::info!("Removed account {}", account.account_name);
        Ok(())
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.list_accounts().await
    }

    pub async fn account_by_name(&self, account_name: &str) -> Result<Option<Account>> {
        self.store.get_account_by_name(account_name).await
    }

    /// Refresh API versions and brand colors; returns whether anything changed.
    pub async fn refresh_capabilities(&self, id: AccountId) -> Result<bool> {
        let account = self.require_account(id).await?;
        match self.provider.fetch_capabilities(&account).await? {
            CapabilitiesOutcome::NotModified => {
                tracing::debug!("Capabilities of {} unchanged", account.account_name);
                Ok(false)
            }
            CapabilitiesOutcome::Changed(capabilities) => {
                self.store.update_capabilities(id, &capabilities).await?;
                if capabilities.api_versions != account.api_versions {
                    tracing::info!(
                        "{} now supports API versions {:?}",
                        account.account_name,
                        capabilities.api_versions
                    );
                }
                Ok(true)
            }
        }
    }

    pub fn request_sync(&self, account_id: AccountId, push_only: bool) -> SyncHandle {
        self.coordinator.request_sync(account_id, push_only)
    }

    // Notes

    /// Create a local note and push it.
    pub async fn add_note_and_sync(
        &self,
        account_id: AccountId,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<(Note, SyncHandle)> {
        self.require_account(account_id).await?;
        let draft = NoteDraft::new(title, content, category.trim());
        let id = self
            .store
            .insert_note(account_id, &draft, NoteOrigin::Local)
            .await?;
        let note = self.require_note(id).await?;
        tracing::debug!("Created note {id} in account {account_id}");

        self.notifier.notes_changed(account_id);
        let handle = self.coordinator.request_sync(account_id, true);
        Ok((note, handle))
    }

    /// Replace a note's content.
    ///
    /// Without an explicit title, a note whose title is still empty gets one
    /// derived from the new content; otherwise the old title is kept.
    pub async fn update_note_and_sync(
        &self,
        id: NoteId,
        content: &str,
        title: Option<&str>,
    ) -> Result<Option<SyncHandle>> {
        let note = self.require_note(id).await?;
        let title = match title {
            Some(title) => title.to_string(),
            None if note.title.trim().is_empty() => generate_note_title(content),
            None => note.title.clone(),
        };
        let rows = self.store.update_content(id, &title, content).await?;
        Ok(self.local_change(note.account_id, rows))
    }

    pub async fn toggle_favorite_and_sync(&self, id: NoteId) -> Result<Option<SyncHandle>> {
        let note = self.require_note(id).await?;
        let rows = self.store.toggle_favorite(id).await?;
        Ok(self.local_change(note.account_id, rows))
    }

    pub async fn set_category_and_sync(
        &self,
        id: NoteId,
        category: &str,
    ) -> Result<Option<SyncHandle>> {
        let note = self.require_note(id).await?;
        let rows = self.store.set_category(id, category.trim()).await?;
        Ok(self.local_change(note.account_id, rows))
    }

    /// Mark a note deleted; the next push removes it from the server.
    pub async fn delete_note_and_sync(&self, id: NoteId) -> Result<Option<SyncHandle>> {
        let note = self.require_note(id).await?;
        let rows = self.store.mark_deleted(id).await?;
        Ok(self.local_change(note.account_id, rows))
    }

    pub async fn note(&self, id: NoteId) -> Result<Option<Note>> {
        self.store.get_note(id).await
    }

    pub async fn update_scroll_y(&self, id: NoteId, scroll_y: i64) -> Result<()> {
        self.store.update_scroll_y(id, scroll_y).await
    }

    /// Notes of a navigation category in its stored sort order
    pub async fn list_notes(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        query: Option<&str>,
    ) -> Result<Vec<Note>> {
        self.store.list_notes(account_id, category, query).await
    }

    pub async fn categories(&self, account_id: AccountId) -> Result<Vec<(String, usize)>> {
        self.store.categories(account_id).await
    }

    pub async fn count_unsynchronized(&self, account_id: AccountId) -> Result<usize> {
        self.store.count_unsynchronized(account_id).await
    }

    pub async fn sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
    ) -> Result<CategorySortingMethod> {
        self.store.sorting_method(account_id, category).await
    }

    pub async fn set_sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        method: CategorySortingMethod,
    ) -> Result<()> {
        self.store
            .set_sorting_method(account_id, category, method)
            .await
    }
}
