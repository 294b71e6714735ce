//! notesync CLI - Offline-first notes from the terminal
//!
//! Every change is saved locally first and pushed to the server when the
//! network allows it.

mod cli;
mod commands;
mod credentials;
mod error;

use clap::Parser;
use notesync_core::config::EngineConfig;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{AccountCommands, Cli, Commands};
use crate::commands::account::{
    run_account_add, run_account_list, run_account_refresh, run_account_remove,
};
use crate::commands::add::run_add;
use crate::commands::common::{default_config_path, open_service, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::favorite::{run_category, run_favorite};
use crate::commands::list::{run_categories, run_list};
use crate::commands::show::run_show;
use crate::commands::sort::run_sort;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "notesync=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = EngineConfig::load(&config_path)?;
    let db_path = resolve_db_path(cli.db_path.clone(), &config);
    let service = open_service(&db_path, &config, cli.network.into()).await?;
    let account = cli.account.as_deref();

    match cli.command {
        Commands::Account { command } => match command {
            AccountCommands::Add {
                url,
                username,
                password,
            } => run_account_add(&service, &url, &username, password).await?,
            AccountCommands::List { json } => run_account_list(&service, json).await?,
            AccountCommands::Remove { name } => run_account_remove(&service, &name).await?,
            AccountCommands::Refresh => run_account_refresh(&service, account).await?,
        },
        Commands::Add {
            content,
            title,
            category,
        } => run_add(&service, account, &content, title.as_deref(), &category).await?,
        Commands::List {
            category,
            query,
            json,
        } => run_list(&service, account, &category, query.as_deref(), json).await?,
        Commands::Show { id, json } => run_show(&service, &id, json).await?,
        Commands::Edit { id, title } => run_edit(&service, &id, title.as_deref()).await?,
        Commands::Delete { id } => run_delete(&service, &id).await?,
        Commands::Favorite { id } => run_favorite(&service, &id).await?,
        Commands::Category { id, name } => run_category(&service, &id, &name).await?,
        Commands::Categories { json } => run_categories(&service, account, json).await?,
        Commands::Sort { category, method } => {
            run_sort(&service, account, &category, method).await?;
        }
        Commands::Sync { push_only } => run_sync(&service, account, push_only).await?,
        Commands::Status { json } => run_status(&service, json).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
