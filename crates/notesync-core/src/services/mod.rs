//! Services shared by clients of the engine

mod notes;
mod store;

pub use notes::NotesService;
pub use store::NotesStore;
