//! Note repository implementation
//!
//! Every conditional mutation is a single `UPDATE`/`DELETE` statement so the
//! guard and the write are atomic with respect to concurrent writers.

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    AccountId, CategorySortingMethod, NavigationCategory, Note, NoteDraft, NoteId, NoteOrigin,
    NoteStatus, PushSnapshot, RemoteId, RemoteNote,
};
use crate::util::unix_millis_now;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

const NOTE_COLUMNS: &str = "id, remote_id, account_id, title, content, excerpt, category, \
                            favorite, etag, modified, status, scroll_y";

/// Trait for note storage operations
pub trait NoteRepository {
    /// Insert a note; its status follows from `origin`
    fn insert_note(&self, account_id: AccountId, draft: &NoteDraft, origin: NoteOrigin)
        -> Result<NoteId>;

    /// Get a note by local ID
    fn get(&self, id: NoteId) -> Result<Option<Note>>;

    /// Record the server ID assigned to a note
    fn update_remote_id(&self, id: NoteId, remote_id: RemoteId) -> Result<()>;

    /// Apply a push response if the row still holds `snapshot` and was not
    /// deleted meanwhile; resets status to VOID
    fn update_after_push(
        &self,
        id: NoteId,
        remote: &RemoteNote,
        snapshot: &PushSnapshot,
    ) -> Result<usize>;

    /// Apply a pulled server copy if the row is VOID and actually differs
    fn update_after_pull(&self, id: NoteId, remote: &RemoteNote) -> Result<usize>;

    /// Delete the row only while it still has `expected` status
    fn delete_if_status(&self, id: NoteId, expected: NoteStatus) -> Result<usize>;

    /// All notes of the account whose status is not VOID
    fn locally_modified(&self, account_id: AccountId) -> Result<Vec<Note>>;

    /// Remote ID to local ID map, excluding locally deleted notes
    fn remote_id_map(&self, account_id: AccountId) -> Result<HashMap<RemoteId, NoteId>>;

    /// Replace title and content of a user-edited note
    fn update_content(&self, id: NoteId, title: &str, content: &str) -> Result<usize>;

    /// Flip the favorite flag of a user-edited note
    fn toggle_favorite(&self, id: NoteId) -> Result<usize>;

    /// Move a note to another category
    fn set_category(&self, id: NoteId, category: &str) -> Result<usize>;

    /// Mark a note as deleted by the user
    fn mark_deleted(&self, id: NoteId) -> Result<usize>;

    /// Persist the editor scroll position
    fn update_scroll_y(&self, id: NoteId, scroll_y: i64) -> Result<()>;

    /// List visible notes of a navigation category, favorites first
    fn list(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        sorting: CategorySortingMethod,
        query: Option<&str>,
    ) -> Result<Vec<Note>>;

    /// Number of visible notes
    fn count(&self, account_id: AccountId) -> Result<usize>;

    /// Number of notes waiting for a push
    fn count_unsynchronized(&self, account_id: AccountId) -> Result<usize>;

    /// Categories with the number of visible notes in each
    fn categories(&self, account_id: AccountId) -> Result<Vec<(String, usize)>>;
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a row selected with `NOTE_COLUMNS`
    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        Ok(Note {
            id: NoteId::new(row.get(0)?),
            remote_id: row.get(1)?,
            account_id: AccountId::new(row.get(2)?),
            title: row.get(3)?,
            content: row.get(4)?,
            excerpt: row.get(5)?,
            category: row.get(6)?,
            favorite: row.get(7)?,
            etag: row.get(8)?,
            modified: row.get(9)?,
            status: row.get(10)?,
            scroll_y: row.get(11)?,
        })
    }
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(
        &self,
        account_id: AccountId,
        draft: &NoteDraft,
        origin: NoteOrigin,
    ) -> Result<NoteId> {
        self.conn.execute(
            "INSERT INTO notes (remote_id, account_id, status, title, modified, content, favorite, category, etag, excerpt)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                draft.remote_id,
                account_id.get(),
                origin.initial_status(),
                draft.title,
                draft.modified,
                draft.content,
                draft.favorite,
                draft.category,
                draft.etag,
                draft.excerpt(),
            ],
        )?;
        Ok(NoteId::new(self.conn.last_insert_rowid()))
    }

    fn get(&self, id: NoteId) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                params![id.get()],
                Self::parse_note,
            )
            .optional()?;
        Ok(note)
    }

    fn update_remote_id(&self, id: NoteId, remote_id: RemoteId) -> Result<()> {
        self.conn.execute(
            "UPDATE notes SET remote_id = ? WHERE id = ?",
            params![remote_id, id.get()],
        )?;
        Ok(())
    }

    fn update_after_push(
        &self,
        id: NoteId,
        remote: &RemoteNote,
        snapshot: &PushSnapshot,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE notes
             SET title = ?, modified = ?, favorite = ?, etag = ?, content = ?, status = '', excerpt = ?
             WHERE id = ? AND status != ? AND content = ? AND favorite = ? AND category = ?",
            params![
                remote.title,
                remote.modified,
                remote.favorite,
                remote.etag,
                remote.content,
                remote.excerpt(),
                id.get(),
                NoteStatus::LocalDeleted,
                snapshot.content,
                snapshot.favorite,
                snapshot.category,
            ],
        )?;
        Ok(rows)
    }

    fn update_after_pull(&self, id: NoteId, remote: &RemoteNote) -> Result<usize> {
        let excerpt = remote.excerpt();
        let rows = self.conn.execute(
            "UPDATE notes
             SET title = ?1, modified = ?2, favorite = ?3, etag = ?4, content = ?5, status = '', excerpt = ?6, category = ?7
             WHERE id = ?8 AND status = ''
               AND (title != ?1 OR modified != ?2 OR favorite != ?3 OR category != ?7
                    OR etag IS NULL OR etag IS NOT ?4 OR content != ?5 OR excerpt != ?6)",
            params![
                remote.title,
                remote.modified,
                remote.favorite,
                remote.etag,
                remote.content,
                excerpt,
                remote.category,
                id.get(),
            ],
        )?;
        Ok(rows)
    }

    fn delete_if_status(&self, id: NoteId, expected: NoteStatus) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM notes WHERE id = ? AND status = ?",
            params![id.get(), expected],
        )?;
        Ok(rows)
    }

    fn locally_modified(&self, account_id: AccountId) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE account_id = ? AND status != '' ORDER BY id"
        ))?;
        let notes = stmt
            .query_map(params![account_id.get()], Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn remote_id_map(&self, account_id: AccountId) -> Result<HashMap<RemoteId, NoteId>> {
        let mut stmt = self.conn.prepare(
            "SELECT remote_id, id FROM notes
             WHERE account_id = ? AND remote_id IS NOT NULL AND status != ?",
        )?;
        let map = stmt
            .query_map(params![account_id.get(), NoteStatus::LocalDeleted], |row| {
                Ok((row.get::<_, RemoteId>(0)?, NoteId::new(row.get(1)?)))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(map)
    }

    fn update_content(&self, id: NoteId, title: &str, content: &str) -> Result<usize> {
        let draft = NoteDraft {
            title: title.to_string(),
            content: content.to_string(),
            ..NoteDraft::default()
        };
        let rows = self.conn.execute(
            "UPDATE notes
             SET title = ?1, content = ?2, excerpt = ?3, modified = ?4, status = ?5
             WHERE id = ?6 AND status != ?7 AND (title != ?1 OR content != ?2)",
            params![
                title,
                content,
                draft.excerpt(),
                unix_millis_now(),
                NoteStatus::LocalEdited,
                id.get(),
                NoteStatus::LocalDeleted,
            ],
        )?;
        Ok(rows)
    }

    fn toggle_favorite(&self, id: NoteId) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE notes SET favorite = NOT favorite, status = ? WHERE id = ? AND status != ?",
            params![NoteStatus::LocalEdited, id.get(), NoteStatus::LocalDeleted],
        )?;
        Ok(rows)
    }

    fn set_category(&self, id: NoteId, category: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE notes SET category = ?1, status = ?2
             WHERE id = ?3 AND status != ?4 AND category != ?1",
            params![
                category,
                NoteStatus::LocalEdited,
                id.get(),
                NoteStatus::LocalDeleted
            ],
        )?;
        Ok(rows)
    }

    fn mark_deleted(&self, id: NoteId) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE notes SET status = ?1 WHERE id = ?2 AND status != ?1",
            params![NoteStatus::LocalDeleted, id.get()],
        )?;
        Ok(rows)
    }

    fn update_scroll_y(&self, id: NoteId, scroll_y: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE notes SET scroll_y = ? WHERE id = ?",
            params![scroll_y, id.get()],
        )?;
        Ok(())
    }

    fn list(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        sorting: CategorySortingMethod,
        query: Option<&str>,
    ) -> Result<Vec<Note>> {
        let mut sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE account_id = ? AND status != ?"
        );
        let mut values: Vec<rusqlite::types::Value> = vec![
            account_id.get().into(),
            NoteStatus::LocalDeleted.as_str().to_string().into(),
        ];

        match category {
            NavigationCategory::Recent => {}
            NavigationCategory::Favorites => sql.push_str(" AND favorite = 1"),
            NavigationCategory::Uncategorized => sql.push_str(" AND category = ''"),
            NavigationCategory::Category(name) => {
                sql.push_str(" AND (category = ? OR category LIKE ? ESCAPE '\\')");
                values.push(name.clone().into());
                values.push(format!("{}/%", escape_like(name)).into());
            }
        }

        if let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) {
            sql.push_str(" AND (title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(query));
            values.push(pattern.clone().into());
            values.push(pattern.into());
        }

        if matches!(category, NavigationCategory::Favorites) {
            sql.push_str(&format!(" ORDER BY {}", sorting.order_clause()));
        } else {
            sql.push_str(&format!(" ORDER BY favorite DESC, {}", sorting.order_clause()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(params_from_iter(values), Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn count(&self, account_id: AccountId) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE account_id = ? AND status != ?",
            params![account_id.get(), NoteStatus::LocalDeleted],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_unsynchronized(&self, account_id: AccountId) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE account_id = ? AND status != ''",
            params![account_id.get()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn categories(&self, account_id: AccountId) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM notes
             WHERE account_id = ? AND status != ? AND category != ''
             GROUP BY category
             ORDER BY category COLLATE NOCASE ASC",
        )?;
        let categories = stmt
            .query_map(params![account_id.get(), NoteStatus::LocalDeleted], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }
}
