use notesync_core::NotesService;

use crate::commands::common::{finish_local_change, resolve_note};
use crate::error::CliError;

pub async fn run_favorite(service: &NotesService, id: &str) -> Result<(), CliError> {
    let note = resolve_note(service, id).await?;

    let handle = service.toggle_favorite_and_sync(note.id).await?;
    let state = if note.favorite { "unstarred" } else { "starred" };
    println!("{} {state}", note.id);
    finish_local_change(service, handle).await
}

pub async fn run_category(service: &NotesService, id: &str, name: &str) -> Result<(), CliError> {
    let note = resolve_note(service, id).await?;

    let handle = service.set_category_and_sync(note.id, name).await?;
    if handle.is_none() {
        println!("{} already in that category", note.id);
        return Ok(());
    }
    println!("{}", note.id);
    finish_local_change(service, handle).await
}
