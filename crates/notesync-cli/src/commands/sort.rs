use notesync_core::NotesService;

use crate::cli::SortArg;
use crate::commands::common::{parse_category, resolve_account};
use crate::error::CliError;

pub async fn run_sort(
    service: &NotesService,
    account_name: Option<&str>,
    category: &str,
    method: Option<SortArg>,
) -> Result<(), CliError> {
    let account = resolve_account(service, account_name).await?;
    let category = parse_category(category)?;

    if let Some(method) = method {
        service
            .set_sorting_method(account.id, &category, method.into())
            .await?;
    }
    let current = service.sorting_method(account.id, &category).await?;
    println!("{category}: {current}");
    Ok(())
}
