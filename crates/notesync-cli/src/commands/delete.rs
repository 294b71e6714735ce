use notesync_core::NotesService;

use crate::commands::common::{finish_local_change, resolve_note};
use crate::error::CliError;

pub async fn run_delete(service: &NotesService, id: &str) -> Result<(), CliError> {
    let note = resolve_note(service, id).await?;

    let handle = service.delete_note_and_sync(note.id).await?;
    println!("{}", note.id);
    finish_local_change(service, handle).await
}
