use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use notesync_core::config::EngineConfig;
use notesync_core::models::{Account, NavigationCategory, Note, NoteId, NoteStatus};
use notesync_core::notify::NoopNotifier;
use notesync_core::remote::HttpNotesApiProvider;
use notesync_core::sync::{Connectivity, NetworkStatus};
use notesync_core::{NotesService, NotesStore, SyncHandle, SyncReport};
use serde::Serialize;

use crate::credentials::KeyringCredentialStore;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub remote_id: Option<i64>,
    pub title: String,
    pub category: String,
    pub favorite: bool,
    pub excerpt: String,
    pub modified: i64,
    pub relative_time: String,
    pub status: String,
}

/// Build the engine for one CLI invocation.
pub async fn open_service(
    db_path: &Path,
    config: &EngineConfig,
    connectivity: Connectivity,
) -> Result<NotesService, CliError> {
    let store = NotesStore::open_path(db_path.to_path_buf()).await?;
    tracing::debug!("Opened notes database at {}", db_path.display());
    let provider = HttpNotesApiProvider::new(
        Arc::new(KeyringCredentialStore),
        config.http_timeouts(),
    );
    Ok(NotesService::new(
        store,
        Arc::new(provider),
        Arc::new(NoopNotifier),
        NetworkStatus::new(connectivity, config.sync_only_on_wifi),
        tokio::runtime::Handle::current(),
    ))
}

/// Pick the account named on the command line, or the only one there is.
pub async fn resolve_account(
    service: &NotesService,
    name: Option<&str>,
) -> Result<Account, CliError> {
    let account = if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
        service
            .account_by_name(name)
            .await?
            .ok_or_else(|| CliError::UnknownAccount(name.to_string()))?
    } else {
        let mut accounts = service.accounts().await?;
        match accounts.len() {
            0 => return Err(CliError::NoAccount),
            1 => accounts.remove(0),
            _ => {
                let names = accounts
                    .iter()
                    .map(|account| account.account_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(CliError::AmbiguousAccount(names));
            }
        }
    };
    tracing::debug!("Using account {}", account.account_name);
    service.coordinator().set_current_account(Some(account.id));
    Ok(account)
}

pub fn parse_note_id(id: &str) -> Result<NoteId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    trimmed
        .parse::<NoteId>()
        .map_err(|_| CliError::NoteNotFound(trimmed.to_string()))
}

pub async fn resolve_note(service: &NotesService, id: &str) -> Result<Note, CliError> {
    let note_id = parse_note_id(id)?;
    match service.note(note_id).await? {
        Some(note) if note.status != NoteStatus::LocalDeleted => Ok(note),
        _ => Err(CliError::NoteNotFound(id.trim().to_string())),
    }
}

pub fn parse_category(raw: &str) -> Result<NavigationCategory, CliError> {
    raw.parse::<NavigationCategory>()
        .map_err(CliError::InvalidArgument)
}

/// Wait for the push of a local change when the network allows it.
pub async fn finish_local_change(
    service: &NotesService,
    handle: Option<SyncHandle>,
) -> Result<(), CliError> {
    let Some(handle) = handle else {
        return Ok(());
    };
    if !service.coordinator().is_sync_possible() {
        tracing::info!("Sync not possible right now, leaving the push queued");
        println!("Saved locally; changes will be pushed on the next sync");
        return Ok(());
    }
    if let Some(report) = handle.wait().await {
        warn_sync_errors(&report);
    }
    Ok(())
}

/// Print recorded sync errors; the local state is already committed.
pub fn warn_sync_errors(report: &SyncReport) {
    for error in &report.errors {
        eprintln!("Warning: {error}");
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let marker = if note.favorite { '*' } else { ' ' };
            let title = truncate_chars(&note.title, 40);
            let relative_time = format_relative_time(note.modified, now_ms);
            let pending = if note.status == NoteStatus::Void {
                ""
            } else {
                "  (unsynced)"
            };
            if note.category.is_empty() {
                format!("{:>5} {marker} {title:<40}  {relative_time}{pending}", note.id.get())
            } else {
                format!(
                    "{:>5} {marker} {title:<40}  {relative_time:<10}  [{}]{pending}",
                    note.id.get(), note.category
                )
            }
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.get(),
        remote_id: note.remote_id,
        title: note.title.clone(),
        category: note.category.clone(),
        favorite: note.favorite,
        excerpt: note.excerpt.clone(),
        modified: note.modified,
        relative_time: format_relative_time(note.modified, now_ms),
        status: note.status.to_string(),
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }
    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }
    if let Some(content) = capture_editor_input_with_initial("")? {
        return Ok(content);
    }
    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // EDITOR may carry arguments, e.g. "code --wait"
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };
            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notesync-note-{}-{now}.md", std::process::id()))
}

/// Command line first, then configuration (which already applied
/// `NOTESYNC_DB_PATH`), then the platform data directory.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &EngineConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notesync")
        .join("notes.db")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notesync")
        .join("config.json")
}
