//! Shared database service used by the sync engine and clients.
//!
//! Each method takes the connection lock once, so every operation is atomic
//! with respect to the others. The lock is never held across network calls.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::db::{
    AccountRepository, CategoryOptionsRepository, Database, NoteRepository,
    SqliteAccountRepository, SqliteCategoryOptionsRepository, SqliteNoteRepository,
};
use crate::models::{
    Account, AccountId, ApiVersion, Capabilities, CategorySortingMethod, NavigationCategory,
    NewAccount, Note, NoteDraft, NoteId, NoteOrigin, NoteStatus, PushSnapshot, RemoteId,
    RemoteNote,
};
use crate::Result;

/// Thread-safe handle to the local note store
#[derive(Clone)]
pub struct NotesStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl NotesStore {
    /// Open a store at the given filesystem path, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::info!("Opened note store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    async fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        f(db.connection())
    }

    // Accounts

    pub async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        self.with_conn(|conn| SqliteAccountRepository::new(conn).create(account))
            .await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.with_conn(|conn| SqliteAccountRepository::new(conn).get(id))
            .await
    }

    pub async fn get_account_by_name(&self, account_name: &str) -> Result<Option<Account>> {
        self.with_conn(|conn| SqliteAccountRepository::new(conn).get_by_name(account_name))
            .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.with_conn(|conn| SqliteAccountRepository::new(conn).list())
            .await
    }

    /// Delete an account, its notes and all of its sort preferences.
    pub async fn delete_account(&self, id: AccountId) -> Result<()> {
        self.with_conn(|conn| {
            SqliteAccountRepository::new(conn).delete(id)?;
            SqliteCategoryOptionsRepository::new(conn).clear_account(id)
        })
        .await
    }

    pub async fn update_display_name(&self, id: AccountId, name: Option<&str>) -> Result<()> {
        self.with_conn(|conn| SqliteAccountRepository::new(conn).update_display_name(id, name))
            .await
    }

    pub async fn update_capabilities(
        &self,
        id: AccountId,
        capabilities: &Capabilities,
    ) -> Result<()> {
        self.with_conn(|conn| {
            SqliteAccountRepository::new(conn).update_capabilities(id, capabilities)
        })
        .await
    }

    /// Store the validators of a list response; returns whether the API versions changed.
    pub async fn record_list_markers(
        &self,
        id: AccountId,
        etag: Option<&str>,
        modified: Option<i64>,
        api_versions: Option<&[ApiVersion]>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let repo = SqliteAccountRepository::new(conn);
            repo.update_etag(id, etag)?;
            repo.update_modified(id, modified)?;
            match api_versions {
                Some(versions) if !versions.is_empty() => repo.update_api_versions(id, versions),
                _ => Ok(false),
            }
        })
        .await
    }

    // Notes

    pub async fn insert_note(
        &self,
        account_id: AccountId,
        draft: &NoteDraft,
        origin: NoteOrigin,
    ) -> Result<NoteId> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).insert_note(account_id, draft, origin))
            .await
    }

    pub async fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).get(id))
            .await
    }

    pub async fn update_remote_id(&self, id: NoteId, remote_id: RemoteId) -> Result<()> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).update_remote_id(id, remote_id))
            .await
    }

    pub async fn update_after_push(
        &self,
        id: NoteId,
        remote: &RemoteNote,
        snapshot: &PushSnapshot,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            SqliteNoteRepository::new(conn).update_after_push(id, remote, snapshot)
        })
        .await
    }

    pub async fn update_after_pull(&self, id: NoteId, remote: &RemoteNote) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).update_after_pull(id, remote))
            .await
    }

    pub async fn delete_if_status(&self, id: NoteId, expected: NoteStatus) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).delete_if_status(id, expected))
            .await
    }

    pub async fn locally_modified(&self, account_id: AccountId) -> Result<Vec<Note>> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).locally_modified(account_id))
            .await
    }

    pub async fn remote_id_map(&self, account_id: AccountId) -> Result<HashMap<RemoteId, NoteId>> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).remote_id_map(account_id))
            .await
    }

    pub async fn update_content(&self, id: NoteId, title: &str, content: &str) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).update_content(id, title, content))
            .await
    }

    pub async fn toggle_favorite(&self, id: NoteId) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).toggle_favorite(id))
            .await
    }

    pub async fn set_category(&self, id: NoteId, category: &str) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).set_category(id, category))
            .await
    }

    pub async fn mark_deleted(&self, id: NoteId) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).mark_deleted(id))
            .await
    }

    pub async fn update_scroll_y(&self, id: NoteId, scroll_y: i64) -> Result<()> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).update_scroll_y(id, scroll_y))
            .await
    }

    /// List a navigation category using its stored sort order.
    pub async fn list_notes(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        query: Option<&str>,
    ) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let sorting =
                SqliteCategoryOptionsRepository::new(conn).sorting_method(account_id, category)?;
            SqliteNoteRepository::new(conn).list(account_id, category, sorting, query)
        })
        .await
    }

    pub async fn count_notes(&self, account_id: AccountId) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).count(account_id))
            .await
    }

    pub async fn count_unsynchronized(&self, account_id: AccountId) -> Result<usize> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).count_unsynchronized(account_id))
            .await
    }

    pub async fn categories(&self, account_id: AccountId) -> Result<Vec<(String, usize)>> {
        self.with_conn(|conn| SqliteNoteRepository::new(conn).categories(account_id))
            .await
    }

    // Category options

    pub async fn sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
    ) -> Result<CategorySortingMethod> {
        self.with_conn(|conn| {
            SqliteCategoryOptionsRepository::new(conn).sorting_method(account_id, category)
        })
        .await
    }

    pub async fn set_sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        method: CategorySortingMethod,
    ) -> Result<()> {
        self.with_conn(|conn| {
            SqliteCategoryOptionsRepository::new(conn).set_sorting_method(
                account_id, category, method,
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("notes.db");
        let store = NotesStore::open_path(&path).await.unwrap();
        assert_eq!(store.db_path(), Some(&path));
        assert!(path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_account_cascades() {
        let store = NotesStore::open_in_memory().unwrap();
        let account = store
            .create_account(&NewAccount::new("https://cloud.example.com", "alice"))
            .await
            .unwrap();
        let note = store
            .insert_note(account.id, &NoteDraft::new("", "hello", ""), NoteOrigin::Local)
            .await
            .unwrap();
        store
            .set_sorting_method(
                account.id,
                &NavigationCategory::Recent,
                CategorySortingMethod::SortLexicographicalAsc,
            )
            .await
            .unwrap();

        store.delete_account(account.id).await.unwrap();

        assert!(store.get_note(note).await.unwrap().is_none());
        assert_eq!(
            store
                .sorting_method(account.id, &NavigationCategory::Recent)
                .await
                .unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_list_markers_reports_version_changes() {
        let store = NotesStore::open_in_memory().unwrap();
        let account = store
            .create_account(&NewAccount::new("https://cloud.example.com", "alice"))
            .await
            .unwrap();
        let versions = [ApiVersion::V1_0];

        assert!(store
            .record_list_markers(account.id, Some("e1"), Some(5_000), Some(&versions))
            .await
            .unwrap());
        assert!(!store
            .record_list_markers(account.id, Some("e2"), Some(6_000), Some(&versions))
            .await
            .unwrap());
        assert!(!store
            .record_list_markers(account.id, Some("e3"), None, None)
            .await
            .unwrap());

        let stored = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(stored.etag.as_deref(), Some("e3"));
        assert_eq!(stored.modified, None);
        assert_eq!(stored.api_versions, versions.to_vec());
    }
}
