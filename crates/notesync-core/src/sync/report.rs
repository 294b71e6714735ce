//! Outcome of one sync round.

use std::fmt;

use thiserror::Error;

use crate::error::Error;
use crate::models::{AccountId, NoteId};
use crate::remote::RemoteError;

/// An error recorded during a sync round
#[derive(Debug, Error)]
pub enum SyncError {
    /// Pushing one note failed; other notes were still processed
    #[error("push of note {note_id} failed: {source}")]
    Push {
        note_id: NoteId,
        #[source]
        source: Error,
    },

    /// The pull phase stopped at this error
    #[error("pull failed: {source}")]
    Pull {
        #[source]
        source: Error,
    },

    /// The round could not start (account lookup, credentials, client)
    #[error("sync setup failed: {source}")]
    Setup {
        #[source]
        source: Error,
    },

    /// The sync task panicked or was cancelled by the runtime
    #[error("sync task aborted: {0}")]
    Aborted(String),
}

impl SyncError {
    /// The remote error behind this failure, if any
    pub const fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Push { source, .. } | Self::Pull { source } | Self::Setup { source } => {
                match source {
                    Error::Remote(remote) => Some(remote),
                    _ => None,
                }
            }
            Self::Aborted(_) => None,
        }
    }
}

/// What a round changed, for logs and user feedback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    /// Local edits accepted by the server
    pub pushed: usize,
    /// Local deletions confirmed
    pub deleted: usize,
    /// Remote notes inserted or updated locally
    pub pulled: usize,
    /// Local copies removed because the server no longer has them
    pub removed: usize,
}

/// Aggregate result of a sync round; errors are collected, never thrown
#[derive(Debug)]
pub struct SyncReport {
    pub account_id: AccountId,
    pub push_only: bool,
    pub errors: Vec<SyncError>,
    pub push_successful: bool,
    /// `true` when the pull phase was skipped
    pub pull_successful: bool,
    /// Whether the pull phase ran
    pub pulled: bool,
    pub counters: SyncCounters,
}

impl SyncReport {
    pub const fn new(account_id: AccountId, push_only: bool) -> Self {
        Self {
            account_id,
            push_only,
            errors: Vec::new(),
            push_successful: true,
            pull_successful: true,
            pulled: false,
            counters: SyncCounters {
                pushed: 0,
                deleted: 0,
                pulled: 0,
                removed: 0,
            },
        }
    }

    /// Report for a task that never returned
    pub fn aborted(account_id: AccountId, push_only: bool, reason: impl Into<String>) -> Self {
        let mut report = Self::new(account_id, push_only);
        report.push_successful = false;
        report.pull_successful = push_only;
        report.errors.push(SyncError::Aborted(reason.into()));
        report
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record_push_error(&mut self, note_id: NoteId, source: Error) {
        self.push_successful = false;
        self.errors.push(SyncError::Push { note_id, source });
    }

    pub(crate) fn record_pull_error(&mut self, source: Error) {
        self.pull_successful = false;
        self.errors.push(SyncError::Pull { source });
    }

    pub(crate) fn record_setup_error(&mut self, source: Error) {
        self.push_successful = false;
        if !self.push_only {
            self.pull_successful = false;
        }
        self.errors.push(SyncError::Setup { source });
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pushed {}, deleted {}, pulled {}, removed {}",
            self.counters.pushed, self.counters.deleted, self.counters.pulled, self.counters.removed
        )?;
        if !self.pulled {
            f.write_str(" (push only)")?;
        }
        if !self.errors.is_empty() {
            write!(f, ", {} error(s)", self.errors.len())?;
        }
        Ok(())
    }
}
