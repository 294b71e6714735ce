use notesync_core::NotesService;

use crate::commands::common::{
    capture_editor_input_with_initial, finish_local_change, resolve_note,
};
use crate::error::CliError;

pub async fn run_edit(
    service: &NotesService,
    id: &str,
    title: Option<&str>,
) -> Result<(), CliError> {
    let note = resolve_note(service, id).await?;

    let Some(edited_content) = capture_editor_input_with_initial(&note.content)? else {
        return Err(CliError::EmptyEditedContent);
    };

    let handle = service
        .update_note_and_sync(note.id, &edited_content, title)
        .await?;
    println!("{}", note.id);
    finish_local_change(service, handle).await
}
