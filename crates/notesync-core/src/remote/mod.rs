//! Remote Notes server access.

mod capabilities;
mod client;
mod credentials;
mod error;
mod provider;
mod wire;

pub use capabilities::{fetch_capabilities, parse_capabilities, CapabilitiesOutcome};
pub use client::{HttpTransport, ListOutcome, NotesApi, NotesClient};
pub use credentials::{CredentialStore, Credentials, InMemoryCredentialStore};
pub use error::{RemoteError, RemoteResult};
pub use provider::{HttpNotesApiProvider, NotesApiProvider};
pub use wire::{ListedNote, NotesListing};
