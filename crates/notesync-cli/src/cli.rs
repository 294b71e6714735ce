use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use notesync_core::models::CategorySortingMethod;
use notesync_core::sync::Connectivity;

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "Offline-first notes, synchronized with a Nextcloud Notes server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Account to act on (`user@host`); may be omitted with a single account
    #[arg(short, long, global = true, value_name = "NAME")]
    pub account: Option<String>,

    /// Network the machine is on; `offline` keeps every change local
    #[arg(long, global = true, value_enum, default_value_t = NetworkArg::Unmetered)]
    pub network: NetworkArg,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage server accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note content (stdin or $EDITOR when omitted)
        content: Vec<String>,
        /// Title; derived from the first line when omitted
        #[arg(short, long)]
        title: Option<String>,
        /// Category, `/` separates sub-categories
        #[arg(short, long, default_value = "")]
        category: String,
    },
    /// List notes of a category
    List {
        /// `@recent`, `@favorites`, `@uncategorized` or a category name
        #[arg(short, long, default_value = "@recent")]
        category: String,
        /// Only notes whose title, content or category contains this text
        #[arg(short, long)]
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one note
    Show {
        /// Local note ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note in $EDITOR
    Edit {
        /// Local note ID
        id: String,
        /// Set a new title instead of keeping the current one
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Delete an existing note
    Delete {
        /// Local note ID
        id: String,
    },
    /// Toggle the favorite flag of a note
    Favorite {
        /// Local note ID
        id: String,
    },
    /// Move a note to another category
    Category {
        /// Local note ID
        id: String,
        /// New category; empty for uncategorized
        #[arg(default_value = "")]
        name: String,
    },
    /// List categories with their note counts
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or set the sort order of a category
    Sort {
        /// `@recent`, `@favorites`, `@uncategorized` or a category name
        category: String,
        /// New sort order
        #[arg(value_enum)]
        method: Option<SortArg>,
    },
    /// Synchronize with the server
    Sync {
        /// Only push local changes
        #[arg(long)]
        push_only: bool,
    },
    /// Show pending local changes and account state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Add an account and store its app password in the keychain
    Add {
        /// Server URL, e.g. https://cloud.example.com
        url: String,
        /// Login name
        username: String,
        /// App password (read from stdin when omitted)
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// List configured accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an account, its local notes and stored password
    Remove {
        /// Account name (`user@host`)
        name: String,
    },
    /// Refresh supported API versions and colors from the server
    Refresh,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum NetworkArg {
    Offline,
    Metered,
    Unmetered,
}

impl From<NetworkArg> for Connectivity {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Offline => Self::Offline,
            NetworkArg::Metered => Self::Metered,
            NetworkArg::Unmetered => Self::Unmetered,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortArg {
    /// Most recently modified first
    Modified,
    /// Alphabetical by title
    Title,
}

impl From<SortArg> for CategorySortingMethod {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Modified => Self::SortModifiedDesc,
            SortArg::Title => Self::SortLexicographicalAsc,
        }
    }
}
