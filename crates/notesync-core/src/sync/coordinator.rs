//! Serializes sync rounds per account.
//!
//! At most one full sync runs per account; a full request arriving while one
//! is in flight is remembered and runs once the current round finishes. Push
//! only rounds may overlap anything, which keeps freshly saved notes moving
//! while a long pull is underway. Callers get a `SyncHandle` that resolves
//! with the report of the round that actually carried their request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;

use super::network::{Connectivity, NetworkStatus};
use super::report::SyncReport;
use super::task::SyncTask;
use crate::models::AccountId;
use crate::notify::ChangeNotifier;
use crate::remote::NotesApiProvider;
use crate::services::NotesStore;
use crate::state::{SyncState, SyncStatus};

/// Where a requested sync currently stands
#[derive(Debug, Clone)]
pub enum SyncProgress {
    /// Registered, not yet picked up
    Pending,
    /// Deferred until the running round ends or the network allows syncing
    Scheduled,
    Finished(Arc<SyncReport>),
}

/// Resolves once the round carrying a request has finished
#[derive(Debug)]
pub struct SyncHandle {
    receiver: watch::Receiver<SyncProgress>,
}

impl SyncHandle {
    pub fn progress(&self) -> SyncProgress {
        self.receiver.borrow().clone()
    }

    /// Wait for the report; `None` when the request was dropped, e.g. because
    /// its account was removed.
    pub async fn wait(mut self) -> Option<Arc<SyncReport>> {
        let progress = self
            .receiver
            .wait_for(|progress| matches!(progress, SyncProgress::Finished(_)))
            .await
            .ok()?;
        match &*progress {
            SyncProgress::Finished(report) => Some(report.clone()),
            _ => None,
        }
    }
}

type Waiter = watch::Sender<SyncProgress>;

#[derive(Default)]
struct AccountSyncState {
    in_flight: usize,
    /// A full sync was requested while another round was running
    scheduled: bool,
    push_waiters: Vec<Waiter>,
    pull_waiters: Vec<Waiter>,
}

#[derive(Default)]
struct CoordinatorState {
    accounts: HashMap<AccountId, AccountSyncState>,
    network: NetworkStatus,
    current_account: Option<AccountId>,
}

struct Inner {
    store: NotesStore,
    provider: Arc<dyn NotesApiProvider>,
    notifier: Arc<dyn ChangeNotifier>,
    runtime: Handle,
    state: Mutex<CoordinatorState>,
    status: watch::Sender<SyncStatus>,
}

/// Entry point for requesting syncs; cheap to clone
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// Create a coordinator spawning its rounds on `runtime`
    pub fn new(
        store: NotesStore,
        provider: Arc<dyn NotesApiProvider>,
        notifier: Arc<dyn ChangeNotifier>,
        network: NetworkStatus,
        runtime: Handle,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        let coordinator = Self {
            inner: Arc::new(Inner {
                store,
                provider,
                notifier,
                runtime,
                state: Mutex::new(CoordinatorState {
                    network,
                    ..CoordinatorState::default()
                }),
                status,
            }),
        };
        coordinator.publish_status(None);
        coordinator
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle resolved by the next round of any kind for the account
    pub fn register_push_handle(&self, account_id: AccountId) -> SyncHandle {
        let (sender, receiver) = watch::channel(SyncProgress::Pending);
        self.state()
            .accounts
            .entry(account_id)
            .or_default()
            .push_waiters
            .push(sender);
        SyncHandle { receiver }
    }

    /// Handle resolved by the next full round for the account
    pub fn register_pull_handle(&self, account_id: AccountId) -> SyncHandle {
        let (sender, receiver) = watch::channel(SyncProgress::Pending);
        self.state()
            .accounts
            .entry(account_id)
            .or_default()
            .pull_waiters
            .push(sender);
        SyncHandle { receiver }
    }

    /// Register a handle and schedule the matching round.
    pub fn request_sync(&self, account_id: AccountId, push_only: bool) -> SyncHandle {
        let handle = if push_only {
            self.register_push_handle(account_id)
        } else {
            self.register_pull_handle(account_id)
        };
        self.schedule_sync(account_id, push_only);
        handle
    }

    /// Start a round now if allowed, otherwise remember it.
    pub fn schedule_sync(&self, account_id: AccountId, push_only: bool) {
        let mut state = self.state();
        let possible = state.network.is_sync_possible();
        let entry = state.accounts.entry(account_id).or_default();

        if possible && (entry.in_flight == 0 || push_only) {
            let mut waiters = std::mem::take(&mut entry.push_waiters);
            if !push_only {
                waiters.append(&mut entry.pull_waiters);
                entry.scheduled = false;
            }
            entry.in_flight += 1;
            drop(state);

            tracing::debug!(
                "Starting {} sync for account {account_id}",
                if push_only { "push-only" } else { "full" }
            );
            self.publish_status(None);
            self.spawn(account_id, push_only, waiters);
            return;
        }

        if !push_only {
            entry.scheduled = true;
            for waiter in &entry.pull_waiters {
                waiter.send_replace(SyncProgress::Scheduled);
            }
        }
        for waiter in &entry.push_waiters {
            waiter.send_replace(SyncProgress::Scheduled);
        }
        tracing::debug!(
            "Deferred sync for account {account_id} (sync possible: {possible})"
        );
    }

    fn spawn(&self, account_id: AccountId, push_only: bool, waiters: Vec<Waiter>) {
        let coordinator = self.clone();
        let task = SyncTask::new(
            account_id,
            push_only,
            self.inner.store.clone(),
            self.inner.provider.clone(),
        );
        self.inner.runtime.spawn(async move {
            // Run in its own task so a panic still releases the account
            let report = match coordinator.inner.runtime.spawn(task.run()).await {
                Ok(report) => report,
                Err(error) => {
                    tracing::error!("Sync task for account {account_id} died: {error}");
                    SyncReport::aborted(account_id, push_only, error.to_string())
                }
            };
            coordinator.finish(account_id, Arc::new(report), waiters);
        });
    }

    fn finish(&self, account_id: AccountId, report: Arc<SyncReport>, waiters: Vec<Waiter>) {
        for error in &report.errors {
            tracing::warn!("Sync of account {account_id}: {error}");
        }

        let scheduled = {
            let mut state = self.state();
            let entry = state.accounts.entry(account_id).or_default();
            entry.in_flight = entry.in_flight.saturating_sub(1);
            entry.scheduled
        };

        self.publish_status(Some(&report));
        self.inner.notifier.notes_changed(account_id);
        for waiter in waiters {
            waiter.send_replace(SyncProgress::Finished(report.clone()));
        }

        if scheduled {
            tracing::debug!("Running deferred full sync for account {account_id}");
            self.schedule_sync(account_id, false);
        }
    }

    fn publish_status(&self, report: Option<&Arc<SyncReport>>) {
        let (syncing, possible) = {
            let state = self.state();
            (
                state.accounts.values().any(|entry| entry.in_flight > 0),
                state.network.is_sync_possible(),
            )
        };
        self.inner.status.send_modify(|status| {
            if let Some(report) = report {
                status.last_failure = if report.is_success() {
                    None
                } else {
                    Some(report.clone())
                };
            }
            status.state = if syncing {
                SyncState::Syncing
            } else if !possible {
                SyncState::Offline
            } else if status.last_failure.is_some() {
                SyncState::Error
            } else {
                SyncState::Synced
            };
        });
    }

    pub fn is_sync_possible(&self) -> bool {
        self.state().network.is_sync_possible()
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.state().network
    }

    /// Apply a connectivity change; becoming able to sync triggers a full
    /// sync of the current account.
    pub fn update_network(&self, connectivity: Connectivity) {
        self.change_network(|network| network.connectivity = connectivity);
    }

    pub fn set_sync_only_on_wifi(&self, sync_only_on_wifi: bool) {
        self.change_network(|network| network.sync_only_on_wifi = sync_only_on_wifi);
    }

    fn change_network(&self, change: impl FnOnce(&mut NetworkStatus)) {
        let (was_possible, network, current) = {
            let mut state = self.state();
            let was_possible = state.network.is_sync_possible();
            change(&mut state.network);
            (was_possible, state.network, state.current_account)
        };
        tracing::info!(
            "Network is {} (sync only on Wi-Fi: {})",
            network.connectivity,
            network.sync_only_on_wifi
        );
        self.publish_status(None);

        if !was_possible && network.is_sync_possible() {
            if let Some(account_id) = current {
                self.schedule_sync(account_id, false);
            }
        }
    }

    pub fn set_current_account(&self, account_id: Option<AccountId>) {
        self.state().current_account = account_id;
    }

    pub fn current_account(&self) -> Option<AccountId> {
        self.state().current_account
    }

    /// Whether any round of the account is running
    pub fn is_active(&self, account_id: AccountId) -> bool {
        self.state()
            .accounts
            .get(&account_id)
            .is_some_and(|entry| entry.in_flight > 0)
    }

    /// Whether a full sync is waiting for the running one
    pub fn is_scheduled(&self, account_id: AccountId) -> bool {
        self.state()
            .accounts
            .get(&account_id)
            .is_some_and(|entry| entry.scheduled)
    }

    /// Drop queued requests of a removed account; their handles resolve to `None`.
    pub fn forget_account(&self, account_id: AccountId) {
        let mut state = self.state();
        if let Some(entry) = state.accounts.get_mut(&account_id) {
            entry.scheduled = false;
            entry.push_waiters.clear();
            entry.pull_waiters.clear();
        }
        if state.current_account == Some(account_id) {
            state.current_account = None;
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteDraft, NoteOrigin, NoteStatus};
    use crate::notify::NoopNotifier;
    use crate::remote::RemoteError;
    use crate::sync::testing::{store_with_account, FakeNotesApi, FakeProvider, Op};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl ChangeNotifier for CountingNotifier {
        fn notes_changed(&self, _account_id: AccountId) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn setup(
        connectivity: Connectivity,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> (SyncCoordinator, NotesStore, AccountId, Arc<FakeNotesApi>) {
        let (store, account_id) = store_with_account().await;
        let api = Arc::new(FakeNotesApi::new());
        let coordinator = SyncCoordinator::new(
            store.clone(),
            Arc::new(FakeProvider::new(api.clone())),
            notifier,
            NetworkStatus::new(connectivity, false),
            Handle::current(),
        );
        coordinator.set_current_account(Some(account_id));
        (coordinator, store, account_id, api)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_sync_resolves_handle() {
        let notifier = Arc::new(CountingNotifier::default());
        let (coordinator, _, account_id, api) =
            setup(Connectivity::Unmetered, notifier.clone()).await;
        api.insert_remote("Remote", "hello", "");

        let report = coordinator
            .request_sync(account_id, false)
            .wait()
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.pulled);
        assert_eq!(report.counters.pulled, 1);
        assert!(!coordinator.is_active(account_id));
        assert_eq!(coordinator.status().state, SyncState::Synced);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_requests_wait_for_network() {
        let (coordinator, _, account_id, api) =
            setup(Connectivity::Offline, Arc::new(NoopNotifier)).await;

        let handle = coordinator.request_sync(account_id, false);

        assert!(matches!(handle.progress(), SyncProgress::Scheduled));
        assert!(coordinator.is_scheduled(account_id));
        assert_eq!(coordinator.status().state, SyncState::Offline);
        assert!(api.calls().is_empty());

        coordinator.update_network(Connectivity::Unmetered);
        let report = handle.wait().await.unwrap();

        assert!(report.is_success());
        assert!(!coordinator.is_scheduled(account_id));
        assert_eq!(api.count_calls(Op::List), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_wifi_only_blocks_metered_sync() {
        let (coordinator, _, account_id, api) =
            setup(Connectivity::Metered, Arc::new(NoopNotifier)).await;
        coordinator.set_sync_only_on_wifi(true);
        assert!(!coordinator.is_sync_possible());

        let handle = coordinator.request_sync(account_id, true);
        assert!(matches!(handle.progress(), SyncProgress::Scheduled));

        // Leaving Wi-Fi-only mode runs a full sync, which also carries the push
        coordinator.set_sync_only_on_wifi(false);
        let report = handle.wait().await.unwrap();
        assert!(report.pulled);
        assert_eq!(api.count_calls(Op::List), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_sync_requested_while_running_is_queued() {
        let (coordinator, _, account_id, api) =
            setup(Connectivity::Unmetered, Arc::new(NoopNotifier)).await;
        let gate = api.gate_next(Op::List);

        let first = coordinator.request_sync(account_id, false);
        gate.entered.notified().await;
        assert!(coordinator.is_active(account_id));

        let second = coordinator.request_sync(account_id, false);
        let third = coordinator.request_sync(account_id, false);
        assert!(matches!(second.progress(), SyncProgress::Scheduled));
        assert!(coordinator.is_scheduled(account_id));
        assert_eq!(coordinator.status().state, SyncState::Syncing);
        assert_eq!(api.count_calls(Op::List), 1);

        gate.release.notify_one();
        let first = first.wait().await.unwrap();
        let second = second.wait().await.unwrap();
        let third = third.wait().await.unwrap();

        // Queued requests collapse into one follow-up round
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(api.count_calls(Op::List), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_push_only_overlaps_running_full_sync() {
        let (coordinator, store, account_id, api) =
            setup(Connectivity::Unmetered, Arc::new(NoopNotifier)).await;
        let gate = api.gate_next(Op::List);

        let full = coordinator.request_sync(account_id, false);
        gate.entered.notified().await;

        let id = store
            .insert_note(
                account_id,
                &NoteDraft::new("", "written during pull", ""),
                NoteOrigin::Local,
            )
            .await
            .unwrap();
        let push = coordinator.request_sync(account_id, true).wait().await.unwrap();

        assert!(push.is_success());
        assert!(!push.pulled);
        assert_eq!(push.counters.pushed, 1);
        assert!(matches!(full.progress(), SyncProgress::Pending));
        let note = store.get_note(id).await.unwrap().unwrap();
        assert_eq!(note.status, NoteStatus::Void);

        gate.release.notify_one();
        assert!(full.wait().await.unwrap().is_success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_round_sets_error_status() {
        let (coordinator, _, account_id, api) =
            setup(Connectivity::Unmetered, Arc::new(NoopNotifier)).await;
        api.fail(Op::List, RemoteError::Unreachable("no route".to_string()));

        let report = coordinator
            .request_sync(account_id, false)
            .wait()
            .await
            .unwrap();

        assert!(!report.pull_successful);
        let status = coordinator.status();
        assert_eq!(status.state, SyncState::Error);
        assert!(status.last_failure.is_some());

        api.clear_failures();
        coordinator
            .request_sync(account_id, false)
            .wait()
            .await
            .unwrap();
        let status = coordinator.status();
        assert_eq!(status.state, SyncState::Synced);
        assert!(status.last_failure.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_forgotten_account_drops_handles() {
        let (coordinator, _, account_id, _) =
            setup(Connectivity::Offline, Arc::new(NoopNotifier)).await;
        let handle = coordinator.request_sync(account_id, false);

        coordinator.forget_account(account_id);

        assert!(handle.wait().await.is_none());
        assert_eq!(coordinator.current_account(), None);
    }
}
