use notesync_core::NotesService;

use crate::commands::common::{resolve_account, warn_sync_errors};
use crate::error::CliError;

pub async fn run_sync(
    service: &NotesService,
    account_name: Option<&str>,
    push_only: bool,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    let coordinator = service.coordinator();
    if !coordinator.is_sync_possible() {
        let network = coordinator.network_status();
        return Err(CliError::SyncFailed(format!(
            "cannot sync on a {} network (sync only on Wi-Fi: {})",
            network.connectivity, network.sync_only_on_wifi
        )));
    }

    tracing::info!(
        "Starting {} sync for {}",
        if push_only { "push-only" } else { "full" },
        account.account_name
    );
    let report = service
        .request_sync(account.id, push_only)
        .wait()
        .await
        .ok_or_else(|| CliError::SyncFailed("sync was cancelled".to_string()))?;

    warn_sync_errors(&report);
    if report.is_success() {
        println!("Sync completed: {report}");
        Ok(())
    } else {
        Err(CliError::SyncFailed(report.to_string()))
    }
}
