//! One push + pull round for one account.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Account, AccountId, Note, NoteOrigin, NoteStatus, RemoteNote};
use crate::remote::{ListOutcome, ListedNote, NotesApi, NotesApiProvider, RemoteError};
use crate::services::NotesStore;

use super::report::{SyncCounters, SyncReport};

/// Run-to-completion sync unit bound to one account
pub struct SyncTask {
    account_id: AccountId,
    push_only: bool,
    store: NotesStore,
    provider: Arc<dyn NotesApiProvider>,
}

impl SyncTask {
    pub fn new(
        account_id: AccountId,
        push_only: bool,
        store: NotesStore,
        provider: Arc<dyn NotesApiProvider>,
    ) -> Self {
        Self {
            account_id,
            push_only,
            store,
            provider,
        }
    }

    /// Push local changes, then pull remote ones unless this is a push-only round.
    pub async fn run(self) -> SyncReport {
        let mut report = SyncReport::new(self.account_id, self.push_only);

        let account = match self.store.get_account(self.account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::info!("Account {} no longer exists, nothing to sync", self.account_id);
                return report;
            }
            Err(error) => {
                report.record_setup_error(error);
                return report;
            }
        };

        let api = match self.provider.notes_api(&account) {
            Ok(api) => api,
            Err(error) => {
                self.invalidate_if_rejected(&account, &error);
                report.record_setup_error(error.into());
                return report;
            }
        };

        tracing::info!(
            "Starting {} sync for {}",
            if self.push_only { "push-only" } else { "full" },
            account.account_name
        );

        self.push(&account, api.as_ref(), &mut report).await;

        if !self.push_only {
            report.pulled = true;
            if let Err(error) = self.pull(api.as_ref(), &mut report.counters).await {
                if let Error::Remote(remote) = &error {
                    self.invalidate_if_rejected(&account, remote);
                }
                tracing::warn!("Pull for {} failed: {error}", account.account_name);
                report.record_pull_error(error);
            }
        }

        tracing::info!("Finished sync for {}: {report}", account.account_name);
        report
    }

    fn invalidate_if_rejected(&self, account: &Account, error: &RemoteError) {
        if error.is_auth_expired() {
            self.provider.invalidate(account);
        }
    }

    async fn push(&self, account: &Account, api: &dyn NotesApi, report: &mut SyncReport) {
        let notes = match self.store.locally_modified(account.id).await {
            Ok(notes) => notes,
            Err(error) => {
                report.record_setup_error(error);
                return;
            }
        };
        if notes.is_empty() {
            tracing::debug!("No local changes to push for {}", account.account_name);
            return;
        }

        for note in notes {
            let note_id = note.id;
            let result = match note.status {
                NoteStatus::LocalEdited => self.push_edited(api, note).await,
                NoteStatus::LocalDeleted => self.push_deleted(api, note).await,
                NoteStatus::Void => Ok(PushOutcome::Skipped),
            };

            match result {
                Ok(PushOutcome::Pushed) => report.counters.pushed += 1,
                Ok(PushOutcome::Deleted) => report.counters.deleted += 1,
                Ok(PushOutcome::Skipped) => {}
                Err(Error::Remote(RemoteError::NotModified)) => {
                    tracing::debug!("Server reported note {note_id} as not modified");
                }
                Err(error) => {
                    if let Error::Remote(remote) = &error {
                        self.invalidate_if_rejected(account, remote);
                    }
                    tracing::warn!("Could not push note {note_id}: {error}");
                    report.record_push_error(note_id, error);
                }
            }
        }
    }

    async fn push_edited(&self, api: &dyn NotesApi, note: Note) -> Result<PushOutcome> {
        let snapshot = note.snapshot();
        let draft = note.to_draft();

        let remote = if draft.remote_id.is_some() {
            match api.edit_note(&draft).await {
                Ok(remote) => remote,
                Err(RemoteError::NotFound) => {
                    tracing::debug!("Note {} is gone on the server, creating it again", note.id);
                    self.create_remote(api, &note).await?
                }
                Err(error) => return Err(error.into()),
            }
        } else {
            self.create_remote(api, &note).await?
        };

        let rows = self
            .store
            .update_after_push(note.id, &remote, &snapshot)
            .await?;
        if rows == 0 {
            tracing::debug!(
                "Note {} changed while it was pushed, keeping the local change for the next round",
                note.id
            );
        }
        Ok(PushOutcome::Pushed)
    }

    async fn create_remote(&self, api: &dyn NotesApi, note: &Note) -> Result<RemoteNote> {
        let mut draft = note.to_draft();
        draft.remote_id = None;
        let remote = api.create_note(&draft).await?;
        self.store.update_remote_id(note.id, remote.remote_id).await?;
        Ok(remote)
    }

    async fn push_deleted(&self, api: &dyn NotesApi, note: Note) -> Result<PushOutcome> {
        if let Some(remote_id) = note.remote_id {
            match api.delete_note(remote_id).await {
                Ok(()) => {}
                Err(RemoteError::NotFound) => {
                    tracing::debug!("Note {} was already deleted on the server", note.id);
                }
                Err(error) => return Err(error.into()),
            }
        }
        self.store
            .delete_if_status(note.id, NoteStatus::LocalDeleted)
            .await?;
        Ok(PushOutcome::Deleted)
    }

    async fn pull(&self, api: &dyn NotesApi, counters: &mut SyncCounters) -> Result<()> {
        // Only notes known before the request may be removed as missing
        let known_before = self.store.remote_id_map(self.account_id).await?;
        let Some(account) = self.store.get_account(self.account_id).await? else {
            return Ok(());
        };

        let listing = match api
            .list_notes(account.modified, account.etag.as_deref())
            .await
        {
            Ok(ListOutcome::Changed(listing)) => listing,
            Ok(ListOutcome::NotModified) | Err(RemoteError::NotModified) => {
                tracing::debug!("Notes of {} are unchanged on the server", account.account_name);
                return Ok(());
            }
            Err(error) if error.is_maintenance() => {
                tracing::info!("Server of {} is in maintenance mode, skipping pull", account.account_name);
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        // Read again so notes pushed meanwhile by an overlapping round are
        // recognized instead of inserted twice
        let known = self.store.remote_id_map(self.account_id).await?;
        let mut seen = HashSet::with_capacity(listing.notes.len());
        for entry in listing.notes {
            seen.insert(entry.remote_id());
            let ListedNote::Full(remote) = entry else {
                continue;
            };
            if let Some(&local_id) = known.get(&remote.remote_id) {
                counters.pulled += self.store.update_after_pull(local_id, &remote).await?;
            } else {
                tracing::debug!("New remote note {}", remote.remote_id);
                self.store
                    .insert_note(self.account_id, &remote.into_draft(), NoteOrigin::Remote)
                    .await?;
                counters.pulled += 1;
            }
        }

        for (remote_id, local_id) in known_before {
            if !seen.contains(&remote_id) {
                counters.removed += self
                    .store
                    .delete_if_status(local_id, NoteStatus::Void)
                    .await?;
            }
        }

        let versions_changed = self
            .store
            .record_list_markers(
                self.account_id,
                listing.etag.as_deref(),
                listing.last_modified,
                listing.supported_api_versions.as_deref(),
            )
            .await?;
        if versions_changed {
            tracing::info!("Server of {} advertises new API versions", account.account_name);
        }
        Ok(())
    }
}

enum PushOutcome {
    Pushed,
    Deleted,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiVersion, NoteDraft, NoteId};
    use crate::sync::testing::{
        store_with_account, FakeNotesApi, FakeProvider, Op, BASE_MODIFIED,
    };
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: NotesStore,
        account_id: AccountId,
        api: Arc<FakeNotesApi>,
        provider: Arc<FakeProvider>,
    }

    impl Fixture {
        async fn new() -> Self {
            let (store, account_id) = store_with_account().await;
            let api = Arc::new(FakeNotesApi::new());
            let provider = Arc::new(FakeProvider::new(api.clone()));
            Self {
                store,
                account_id,
                api,
                provider,
            }
        }

        fn task(&self, push_only: bool) -> SyncTask {
            SyncTask::new(
                self.account_id,
                push_only,
                self.store.clone(),
                self.provider.clone(),
            )
        }

        async fn local_note(&self, content: &str) -> NoteId {
            self.store
                .insert_note(
                    self.account_id,
                    &NoteDraft::new("", content, ""),
                    NoteOrigin::Local,
                )
                .await
                .unwrap()
        }

        async fn note(&self, id: NoteId) -> Note {
            self.store.get_note(id).await.unwrap().unwrap()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_creates_new_notes() {
        let fx = Fixture::new().await;
        let id = fx.local_note("Groceries\nmilk").await;

        let report = fx.task(true).run().await;

        assert!(report.is_success());
        assert!(!report.pulled);
        assert_eq!(report.counters.pushed, 1);
        let note = fx.note(id).await;
        assert_eq!(note.status, NoteStatus::Void);
        let remote_id = note.remote_id.unwrap();
        assert_eq!(fx.api.note(remote_id).unwrap().content, "Groceries\nmilk");
        assert_eq!(note.etag, fx.api.note(remote_id).unwrap().etag);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_keeps_edit_made_during_request() {
        let fx = Fixture::new().await;
        let id = fx.local_note("first").await;
        let gate = fx.api.gate_next(Op::Create);

        let running = tokio::spawn(fx.task(true).run());
        gate.entered.notified().await;
        fx.store.update_content(id, "first", "second").await.unwrap();
        gate.release.notify_one();
        let report = running.await.unwrap();

        assert!(report.is_success());
        let note = fx.note(id).await;
        assert_eq!(note.content, "second");
        assert_eq!(note.status, NoteStatus::LocalEdited);
        // The remote id is recorded even though the push result was discarded
        assert!(note.remote_id.is_some());

        fx.task(true).run().await;
        let note = fx.note(id).await;
        assert_eq!(note.status, NoteStatus::Void);
        assert_eq!(fx.api.notes().len(), 1);
        assert_eq!(fx.api.notes()[0].content, "second");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_recreates_note_deleted_on_server() {
        let fx = Fixture::new().await;
        let id = fx.local_note("keep me").await;
        fx.task(true).run().await;
        let old_remote = fx.note(id).await.remote_id.unwrap();

        fx.api.remove_remote(old_remote);
        fx.store.update_content(id, "keep me", "keep me too").await.unwrap();
        let report = fx.task(true).run().await;

        assert!(report.is_success());
        let note = fx.note(id).await;
        let new_remote = note.remote_id.unwrap();
        assert_ne!(new_remote, old_remote);
        assert_eq!(note.status, NoteStatus::Void);
        assert_eq!(fx.api.note(new_remote).unwrap().content, "keep me too");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_deletes_and_tolerates_missing_remote() {
        let fx = Fixture::new().await;
        let synced = fx.local_note("synced").await;
        let gone = fx.local_note("gone").await;
        fx.task(true).run().await;
        let never_pushed = fx.local_note("draft").await;
        let gone_remote = fx.note(gone).await.remote_id.unwrap();
        fx.api.remove_remote(gone_remote);

        for id in [synced, gone, never_pushed] {
            fx.store.mark_deleted(id).await.unwrap();
        }
        let deletes_before = fx.api.count_calls(Op::Delete);

        let report = fx.task(true).run().await;

        assert!(report.is_success());
        assert_eq!(report.counters.deleted, 3);
        // The never pushed note needs no request
        assert_eq!(fx.api.count_calls(Op::Delete) - deletes_before, 2);
        assert!(fx.api.notes().is_empty());
        for id in [synced, gone, never_pushed] {
            assert!(fx.store.get_note(id).await.unwrap().is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_errors_are_per_note() {
        let fx = Fixture::new().await;
        let id = fx.local_note("offline edit").await;
        fx.api.fail(Op::Create, RemoteError::Unreachable("timeout".to_string()));

        let report = fx.task(false).run().await;

        assert!(!report.push_successful);
        assert!(report.pull_successful);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(fx.note(id).await.status, NoteStatus::LocalEdited);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auth_failure_invalidates_provider() {
        let fx = Fixture::new().await;
        fx.api.fail(Op::List, RemoteError::AuthExpired { status: 401 });

        let report = fx.task(false).run().await;

        assert!(!report.pull_successful);
        assert_eq!(fx.provider.invalidations(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_setup_failure_is_reported() {
        let fx = Fixture::new().await;
        fx.provider
            .fail_setup(RemoteError::MissingCredentials("alice@cloud.example.com".to_string()));

        let report = fx.task(false).run().await;

        assert!(!report.is_success());
        assert!(!report.push_successful);
        assert!(fx.api.calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_inserts_updates_and_removes() {
        let fx = Fixture::new().await;
        let first = fx.api.insert_remote("One", "one", "");
        let second = fx.api.insert_remote("Two", "two", "work");

        let report = fx.task(false).run().await;
        assert!(report.is_success());
        assert_eq!(report.counters.pulled, 2);
        let map = fx.store.remote_id_map(fx.account_id).await.unwrap();
        assert_eq!(map.len(), 2);

        fx.api.edit_remote(first, "one, edited");
        fx.api.remove_remote(second);
        let report = fx.task(false).run().await;

        assert_eq!(report.counters.removed, 1);
        let map = fx.store.remote_id_map(fx.account_id).await.unwrap();
        assert_eq!(map.len(), 1);
        let note = fx.note(map[&first]).await;
        assert_eq!(note.content, "one, edited");
        assert_eq!(note.status, NoteStatus::Void);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_changed_listing_only_pulls_new_notes() {
        let fx = Fixture::new().await;
        fx.api.insert_remote("One", "one", "");
        fx.task(false).run().await;

        // Listing changes; the first note comes back pruned
        fx.api.insert_remote("Two", "two", "");
        let report = fx.task(false).run().await;

        assert!(report.is_success());
        assert_eq!(report.counters.pulled, 1);
        assert_eq!(report.counters.removed, 0);
        assert_eq!(fx.store.count_notes(fx.account_id).await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pruned_entries_keep_local_copies() {
        let fx = Fixture::new().await;
        let old = fx.api.insert_remote("Old", "old", "");
        fx.task(false).run().await;

        fx.api.insert_remote("New", "new", "");
        let report = fx.task(false).run().await;

        assert_eq!(report.counters.removed, 0);
        let map = fx.store.remote_id_map(fx.account_id).await.unwrap();
        assert!(map.contains_key(&old));
        assert_eq!(map.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_keeps_local_edits() {
        let fx = Fixture::new().await;
        let remote_id = fx.api.insert_remote("Shared", "original", "");
        fx.task(false).run().await;
        let map = fx.store.remote_id_map(fx.account_id).await.unwrap();
        let id = map[&remote_id];

        fx.store.update_content(id, "Shared", "mine").await.unwrap();
        fx.api.edit_remote(remote_id, "theirs");
        // A failing push leaves the edit pending while the pull runs
        fx.api.fail(Op::Edit, RemoteError::Unreachable("flaky".to_string()));
        fx.task(false).run().await;

        let note = fx.note(id).await;
        assert_eq!(note.content, "mine");
        assert_eq!(note.status, NoteStatus::LocalEdited);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_does_not_remove_pending_deletes_or_edits() {
        let fx = Fixture::new().await;
        let kept = fx.api.insert_remote("Kept", "kept", "");
        fx.task(false).run().await;
        let id = fx.store.remote_id_map(fx.account_id).await.unwrap()[&kept];

        fx.store.update_content(id, "Kept", "edited offline").await.unwrap();
        fx.api.remove_remote(kept);
        fx.api.fail(Op::Edit, RemoteError::Unreachable("flaky".to_string()));
        fx.api.fail(Op::Create, RemoteError::Unreachable("flaky".to_string()));
        let report = fx.task(false).run().await;

        assert_eq!(report.counters.removed, 0);
        assert_eq!(fx.note(id).await.status, NoteStatus::LocalEdited);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_maintenance_mode_counts_as_success() {
        let fx = Fixture::new().await;
        fx.api.fail(
            Op::List,
            RemoteError::ServerError {
                status: 503,
                message: "maintenance".to_string(),
            },
        );

        let report = fx.task(false).run().await;

        assert!(report.is_success());
        assert!(report.pulled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_markers_are_recorded() {
        let fx = Fixture::new().await;
        fx.api.insert_remote("One", "one", "");

        fx.task(false).run().await;

        let account = fx.store.get_account(fx.account_id).await.unwrap().unwrap();
        assert_eq!(account.etag.as_deref(), Some("list-1"));
        assert_eq!(account.modified, Some(BASE_MODIFIED + 1000));

        // Unchanged server: conditional request answers 304
        let report = fx.task(false).run().await;
        assert!(report.is_success());
        assert_eq!(report.counters.pulled, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_advertised_versions_switch_protocol_next_round() {
        let fx = Fixture::new().await;
        let v1_3 = ApiVersion::new(1, 3);
        fx.api.advertise_versions(&[v1_3, ApiVersion::V0_2]);

        assert!(fx.task(false).run().await.is_success());
        let account = fx.store.get_account(fx.account_id).await.unwrap().unwrap();
        assert_eq!(account.api_versions, vec![v1_3, ApiVersion::V0_2]);

        // Server drops the 1.x API
        fx.api.advertise_versions(&[ApiVersion::V0_2]);
        assert!(fx.task(false).run().await.is_success());
        let account = fx.store.get_account(fx.account_id).await.unwrap().unwrap();
        assert_eq!(account.api_versions, vec![ApiVersion::V0_2]);

        fx.task(true).run().await;
        assert_eq!(
            fx.provider.requested_versions(),
            vec![None, Some(v1_3), Some(ApiVersion::V0_2)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_during_push_is_kept() {
        let fx = Fixture::new().await;
        let id = fx.local_note("short lived").await;
        let gate = fx.api.gate_next(Op::Create);

        let running = tokio::spawn(fx.task(true).run());
        gate.entered.notified().await;
        fx.store.mark_deleted(id).await.unwrap();
        gate.release.notify_one();
        assert!(running.await.unwrap().is_success());

        let note = fx.note(id).await;
        assert_eq!(note.status, NoteStatus::LocalDeleted);
        assert!(note.remote_id.is_some());
        assert_eq!(fx.api.notes().len(), 1);

        let report = fx.task(true).run().await;
        assert!(report.is_success());
        assert_eq!(report.counters.deleted, 1);
        assert!(fx.store.get_note(id).await.unwrap().is_none());
        assert!(fx.api.notes().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_account_is_a_noop() {
        let fx = Fixture::new().await;
        fx.store.delete_account(fx.account_id).await.unwrap();

        let report = fx.task(false).run().await;

        assert!(report.is_success());
        assert!(fx.api.calls().is_empty());
    }
}
