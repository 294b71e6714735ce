//! In-memory notes server and provider for sync tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::models::{
    Account, AccountId, ApiVersion, NewAccount, NoteDraft, RemoteId, RemoteNote,
};
use crate::remote::{
    CapabilitiesOutcome, ListOutcome, ListedNote, NotesApi, NotesApiProvider, NotesListing,
    RemoteError, RemoteResult,
};
use crate::services::NotesStore;

/// Server clock origin; every write lands one second after the previous one
pub const BASE_MODIFIED: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Create,
    Edit,
    Delete,
}

/// Pauses the next call of one operation until released
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct FakeServer {
    notes: BTreeMap<RemoteId, RemoteNote>,
    next_id: RemoteId,
    revision: u64,
    calls: Vec<Op>,
    failures: Vec<(Op, RemoteError)>,
    gate: Option<(Op, Gate)>,
    api_versions: Option<Vec<ApiVersion>>,
}

impl FakeServer {
    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn stamp(revision: u64) -> i64 {
        BASE_MODIFIED + i64::try_from(revision).unwrap_or(i64::MAX / 2) * 1000
    }

    fn listing_etag(&self) -> String {
        format!("list-{}", self.revision)
    }

    fn failure(&mut self, op: Op) -> Option<RemoteError> {
        self.calls.push(op);
        self.failures
            .iter()
            .find(|(failing, _)| *failing == op)
            .map(|(_, error)| error.clone())
    }
}

/// Notes server kept in memory
#[derive(Default)]
pub struct FakeNotesApi {
    server: Mutex<FakeServer>,
}

impl FakeNotesApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn server(&self) -> MutexGuard<'_, FakeServer> {
        self.server.lock().unwrap()
    }

    /// Add a note as if another client created it
    pub fn insert_remote(&self, title: &str, content: &str, category: &str) -> RemoteId {
        let mut server = self.server();
        server.next_id += 1;
        let remote_id = server.next_id;
        let revision = server.bump();
        server.notes.insert(
            remote_id,
            RemoteNote {
                remote_id,
                title: title.to_string(),
                content: content.to_string(),
                category: category.to_string(),
                favorite: false,
                etag: Some(format!("note-{remote_id}-{revision}")),
                modified: FakeServer::stamp(revision),
            },
        );
        remote_id
    }

    /// Change a note as if another client edited it
    pub fn edit_remote(&self, remote_id: RemoteId, content: &str) {
        let mut server = self.server();
        let revision = server.bump();
        let note = server.notes.get_mut(&remote_id).unwrap();
        note.content = content.to_string();
        note.etag = Some(format!("note-{remote_id}-{revision}"));
        note.modified = FakeServer::stamp(revision);
    }

    pub fn remove_remote(&self, remote_id: RemoteId) {
        let mut server = self.server();
        server.notes.remove(&remote_id);
        server.bump();
    }

    /// Send `versions` in the version header of every later listing
    pub fn advertise_versions(&self, versions: &[ApiVersion]) {
        let mut server = self.server();
        server.api_versions = Some(versions.to_vec());
        server.bump();
    }

    pub fn note(&self, remote_id: RemoteId) -> Option<RemoteNote> {
        self.server().notes.get(&remote_id).cloned()
    }

    pub fn notes(&self) -> Vec<RemoteNote> {
        self.server().notes.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Op> {
        self.server().calls.clone()
    }

    pub fn count_calls(&self, op: Op) -> usize {
        self.server().calls.iter().filter(|call| **call == op).count()
    }

    /// Make every call of `op` fail until cleared
    pub fn fail(&self, op: Op, error: RemoteError) {
        self.server().failures.push((op, error));
    }

    pub fn clear_failures(&self) {
        self.server().failures.clear();
    }

    /// Hold the next call of `op` until `Gate::release` is notified
    pub fn gate_next(&self, op: Op) -> Gate {
        let gate = Gate::default();
        self.server().gate = Some((op, gate.clone()));
        gate
    }

    async fn pass_gate(&self, op: Op) {
        let gate = {
            let mut server = self.server();
            match server.gate.take() {
                Some((gated, gate)) if gated == op => Some(gate),
                other => {
                    server.gate = other;
                    None
                }
            }
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn store_note(server: &mut FakeServer, remote_id: RemoteId, note: &NoteDraft) -> RemoteNote {
        let revision = server.bump();
        let stored = RemoteNote {
            remote_id,
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
            favorite: note.favorite,
            etag: Some(format!("note-{remote_id}-{revision}")),
            modified: FakeServer::stamp(revision),
        };
        server.notes.insert(remote_id, stored.clone());
        stored
    }
}

#[async_trait]
impl NotesApi for FakeNotesApi {
    async fn list_notes(
        &self,
        prune_before: Option<i64>,
        last_etag: Option<&str>,
    ) -> RemoteResult<ListOutcome> {
        if let Some(error) = self.server().failure(Op::List) {
            return Err(error);
        }
        self.pass_gate(Op::List).await;
        let server = self.server();
        let etag = server.listing_etag();
        if last_etag == Some(etag.as_str()) {
            return Ok(ListOutcome::NotModified);
        }
        let notes = server
            .notes
            .values()
            .map(|note| match prune_before {
                Some(before) if note.modified <= before => ListedNote::Pruned {
                    remote_id: note.remote_id,
                },
                _ => ListedNote::Full(note.clone()),
            })
            .collect();
        Ok(ListOutcome::Changed(NotesListing {
            notes,
            etag: Some(etag),
            last_modified: Some(FakeServer::stamp(server.revision)),
            supported_api_versions: server.api_versions.clone(),
        }))
    }

    async fn create_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote> {
        if let Some(error) = self.server().failure(Op::Create) {
            return Err(error);
        }
        self.pass_gate(Op::Create).await;
        let mut server = self.server();
        server.next_id += 1;
        let remote_id = server.next_id;
        Ok(Self::store_note(&mut server, remote_id, note))
    }

    async fn edit_note(&self, note: &NoteDraft) -> RemoteResult<RemoteNote> {
        if let Some(error) = self.server().failure(Op::Edit) {
            return Err(error);
        }
        self.pass_gate(Op::Edit).await;
        let mut server = self.server();
        let remote_id = note.remote_id.ok_or(RemoteError::NotFound)?;
        if !server.notes.contains_key(&remote_id) {
            return Err(RemoteError::NotFound);
        }
        Ok(Self::store_note(&mut server, remote_id, note))
    }

    async fn delete_note(&self, remote_id: RemoteId) -> RemoteResult<()> {
        let mut server = self.server();
        if let Some(error) = server.failure(Op::Delete) {
            return Err(error);
        }
        if server.notes.remove(&remote_id).is_none() {
            return Err(RemoteError::NotFound);
        }
        server.bump();
        Ok(())
    }
}

/// Provider handing out one shared `FakeNotesApi`
pub struct FakeProvider {
    pub api: Arc<FakeNotesApi>,
    invalidations: AtomicUsize,
    requested_versions: Mutex<Vec<Option<ApiVersion>>>,
    setup_error: Mutex<Option<RemoteError>>,
    capabilities: Mutex<Option<CapabilitiesOutcome>>,
}

impl FakeProvider {
    pub fn new(api: Arc<FakeNotesApi>) -> Self {
        Self {
            api,
            invalidations: AtomicUsize::new(0),
            requested_versions: Mutex::new(Vec::new()),
            setup_error: Mutex::new(None),
            capabilities: Mutex::new(None),
        }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Preferred API version of the account at each `notes_api` call
    pub fn requested_versions(&self) -> Vec<Option<ApiVersion>> {
        self.requested_versions.lock().unwrap().clone()
    }

    pub fn fail_setup(&self, error: RemoteError) {
        *self.setup_error.lock().unwrap() = Some(error);
    }

    pub fn set_capabilities(&self, outcome: CapabilitiesOutcome) {
        *self.capabilities.lock().unwrap() = Some(outcome);
    }
}

#[async_trait]
impl NotesApiProvider for FakeProvider {
    fn notes_api(&self, account: &Account) -> RemoteResult<Arc<dyn NotesApi>> {
        self.requested_versions
            .lock()
            .unwrap()
            .push(account.preferred_api_version());
        if let Some(error) = self.setup_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.api.clone())
    }

    fn invalidate(&self, _account: &Account) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_capabilities(&self, _account: &Account) -> RemoteResult<CapabilitiesOutcome> {
        Ok(self
            .capabilities
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(CapabilitiesOutcome::NotModified))
    }
}

/// In-memory store with one account
pub async fn store_with_account() -> (NotesStore, AccountId) {
    let store = NotesStore::open_in_memory().unwrap();
    let account = store
        .create_account(&NewAccount::new("https://cloud.example.com", "alice"))
        .await
        .unwrap();
    (store, account.id)
}
