use notesync_core::NotesService;

use crate::commands::common::{
    format_note_lines, note_to_list_item, parse_category, resolve_account, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(
    service: &NotesService,
    account_name: Option<&str>,
    category: &str,
    query: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    let category = parse_category(category)?;
    let query = query.map(str::trim).filter(|query| !query.is_empty());
    let notes = service.list_notes(account.id, &category, query).await?;

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if notes.is_empty() {
        println!("No notes in {category}.");
    } else {
        for line in format_note_lines(&notes) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_categories(
    service: &NotesService,
    account_name: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    let categories = service.categories(account.id).await?;

    if as_json {
        let items = categories
            .iter()
            .map(|(name, count)| serde_json::json!({ "category": name, "count": count }))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for (name, count) in &categories {
        let name = if name.is_empty() { "@uncategorized" } else { name };
        println!("{count:>5}  {name}");
    }
    Ok(())
}
