pub mod account;
pub mod add;
pub mod common;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod favorite;
pub mod list;
pub mod show;
pub mod sort;
pub mod status;
pub mod sync;
