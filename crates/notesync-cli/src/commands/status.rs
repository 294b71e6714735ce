use notesync_core::NotesService;
use serde::Serialize;

use crate::commands::common::format_timestamp;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct AccountStatusItem {
    pub account: String,
    pub notes: usize,
    pub unsynchronized: usize,
    pub last_modified: Option<i64>,
    pub api_version: Option<String>,
}

pub async fn run_status(service: &NotesService, as_json: bool) -> Result<(), CliError> {
    let mut items = Vec::new();
    for account in service.accounts().await? {
        items.push(AccountStatusItem {
            notes: service.store().count_notes(account.id).await?,
            unsynchronized: service.count_unsynchronized(account.id).await?,
            last_modified: account.modified,
            api_version: account
                .preferred_api_version()
                .map(|version| version.to_string()),
            account: account.account_name,
        });
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let network = service.coordinator().network_status();
    println!(
        "Network: {} (sync only on Wi-Fi: {})",
        network.connectivity, network.sync_only_on_wifi
    );
    if items.is_empty() {
        println!("No accounts configured.");
    }
    for item in &items {
        let last = item
            .last_modified
            .map_or_else(|| "never".to_string(), format_timestamp);
        println!(
            "{}: {} notes, {} unsynchronized, server changes seen up to {last}",
            item.account, item.notes, item.unsynchronized
        );
    }
    Ok(())
}
