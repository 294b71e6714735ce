//! Synchronization between the local store and a notes server.

mod coordinator;
mod network;
mod report;
mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{SyncCoordinator, SyncHandle, SyncProgress};
pub use network::{Connectivity, NetworkStatus};
pub use report::{SyncCounters, SyncError, SyncReport};
pub use task::SyncTask;
