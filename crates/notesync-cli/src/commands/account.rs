use std::io::{self, BufRead, IsTerminal, Write};

use notesync_core::models::{Account, NewAccount};
use notesync_core::remote::{CredentialStore, Credentials};
use notesync_core::NotesService;
use serde::Serialize;

use crate::commands::common::{resolve_account, warn_sync_errors};
use crate::credentials::KeyringCredentialStore;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct AccountItem {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub username: String,
    pub display_name: Option<String>,
    pub api_version: Option<String>,
    pub color: String,
}

pub fn account_to_item(account: &Account) -> AccountItem {
    AccountItem {
        id: account.id.get(),
        name: account.account_name.clone(),
        url: account.url.clone(),
        username: account.username.clone(),
        display_name: account.display_name.clone(),
        api_version: account
            .preferred_api_version()
            .map(|version| version.to_string()),
        color: account.color.clone(),
    }
}

pub async fn run_account_add(
    service: &NotesService,
    url: &str,
    username: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    if password.trim().is_empty() {
        return Err(CliError::EmptyPassword);
    }

    let new_account = NewAccount::new(url, username);
    let credentials = KeyringCredentialStore;
    credentials.save(
        &new_account.account_name,
        &Credentials::new(new_account.username.clone(), password),
    )?;

    let (account, handle) = match service.add_account(&new_account).await {
        Ok(added) => added,
        Err(error) => {
            credentials.delete(&new_account.account_name)?;
            return Err(error.into());
        }
    };
    println!("{}", account.account_name);

    if service.coordinator().is_sync_possible() {
        if let Some(report) = handle.wait().await {
            warn_sync_errors(&report);
            println!("Initial sync: {report}");
        }
    }
    Ok(())
}

pub async fn run_account_list(service: &NotesService, as_json: bool) -> Result<(), CliError> {
    let accounts = service.accounts().await?;

    if as_json {
        let items = accounts.iter().map(account_to_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts configured.");
        return Ok(());
    }
    for account in &accounts {
        let version = account
            .preferred_api_version()
            .map_or_else(|| "unknown".to_string(), |version| version.to_string());
        println!("{:<40}  {}  (API {version})", account.label(), account.url);
    }
    Ok(())
}

pub async fn run_account_remove(service: &NotesService, name: &str) -> Result<(), CliError> {
    let account = resolve_account(service, Some(name)).await?;
    service.remove_account(account.id).await?;
    KeyringCredentialStore.delete(&account.account_name)?;
    println!("Removed {}", account.account_name);
    Ok(())
}

pub async fn run_account_refresh(
    service: &NotesService,
    account_name: Option<&str>,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    if service.refresh_capabilities(account.id).await? {
        println!("Capabilities of {} updated", account.account_name);
    } else {
        println!("Capabilities of {} unchanged", account.account_name);
    }
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("App password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
