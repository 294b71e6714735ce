//! Shared sync state types.

use std::sync::Arc;

use crate::sync::SyncReport;

/// Sync state shown to users
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Sync is currently impossible (no network, or metered with Wi-Fi only)
    #[default]
    Offline,
    Syncing,
    Synced,
    Error,
}

/// Latest sync status of the coordinator
#[derive(Clone, Debug, Default)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Report of the last round that recorded errors, until a clean round replaces it
    pub last_failure: Option<Arc<SyncReport>>,
}
