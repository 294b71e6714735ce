use notesync_core::NotesService;

use crate::commands::common::{format_timestamp, resolve_note};
use crate::error::CliError;

pub async fn run_show(service: &NotesService, id: &str, as_json: bool) -> Result<(), CliError> {
    let note = resolve_note(service, id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note)?);
        return Ok(());
    }

    println!("# {}", note.title);
    let mut details = vec![format_timestamp(note.modified)];
    if !note.category.is_empty() {
        details.push(format!("category: {}", note.category));
    }
    if note.favorite {
        details.push("favorite".to_string());
    }
    if note.remote_id.is_none() {
        details.push("never synced".to_string());
    }
    println!("{}", details.join("  |  "));
    println!();
    println!("{}", note.content);
    Ok(())
}
