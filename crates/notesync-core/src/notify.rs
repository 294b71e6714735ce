//! Change notification hook.

use crate::models::AccountId;

/// Told when the notes of an account changed through a sync, so that views,
/// widgets or shortcuts can refresh. Must not block.
pub trait ChangeNotifier: Send + Sync {
    fn notes_changed(&self, account_id: AccountId);
}

/// Notifier that ignores every change
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notes_changed(&self, _account_id: AccountId) {}
}
