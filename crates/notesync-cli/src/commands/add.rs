use notesync_core::NotesService;

use crate::commands::common::{finish_local_change, resolve_account, resolve_note_content};
use crate::error::CliError;

pub async fn run_add(
    service: &NotesService,
    account_name: Option<&str>,
    content_parts: &[String],
    title: Option<&str>,
    category: &str,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    let content = resolve_note_content(content_parts)?;

    let (note, handle) = service
        .add_note_and_sync(account.id, title.unwrap_or_default(), &content, category)
        .await?;
    println!("{}", note.id);

    finish_local_change(service, Some(handle)).await
}
