//! Account repository implementation

use crate::error::{Error, Result};
use crate::models::{
    format_api_versions, parse_api_versions, Account, AccountId, ApiVersion, Capabilities,
    NewAccount, DEFAULT_COLOR, DEFAULT_TEXT_COLOR,
};
use rusqlite::{params, Connection, OptionalExtension};

const ACCOUNT_COLUMNS: &str = "id, url, username, account_name, display_name, api_version, \
                               etag, modified, capabilities_etag, color, text_color";

/// Trait for account storage operations
pub trait AccountRepository {
    /// Create an account; fails with `Constraint` if the name is taken
    fn create(&self, account: &NewAccount) -> Result<Account>;

    fn get(&self, id: AccountId) -> Result<Option<Account>>;

    fn get_by_name(&self, account_name: &str) -> Result<Option<Account>>;

    /// All accounts, ordered by name
    fn list(&self) -> Result<Vec<Account>>;

    /// Delete an account together with its notes and category options
    fn delete(&self, id: AccountId) -> Result<()>;

    /// Remember the ETag of the last note list response
    fn update_etag(&self, id: AccountId, etag: Option<&str>) -> Result<()>;

    /// Remember the Last-Modified of the last note list response
    fn update_modified(&self, id: AccountId, modified: Option<i64>) -> Result<()>;

    /// Store the supported API versions; returns whether the value changed
    fn update_api_versions(&self, id: AccountId, versions: &[ApiVersion]) -> Result<bool>;

    fn update_display_name(&self, id: AccountId, display_name: Option<&str>) -> Result<()>;

    /// Store a fresh capabilities response
    fn update_capabilities(&self, id: AccountId, capabilities: &Capabilities) -> Result<()>;
}

/// `SQLite` implementation of `AccountRepository`
pub struct SqliteAccountRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAccountRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
        let api_version: Option<String> = row.get(5)?;
        Ok(Account {
            id: AccountId::new(row.get(0)?),
            url: row.get(1)?,
            username: row.get(2)?,
            account_name: row.get(3)?,
            display_name: row.get(4)?,
            api_versions: api_version
                .as_deref()
                .map(parse_api_versions)
                .unwrap_or_default(),
            etag: row.get(6)?,
            modified: row.get(7)?,
            capabilities_etag: row.get(8)?,
            color: row.get(9)?,
            text_color: row.get(10)?,
        })
    }

    fn query_one(&self, filter: &str, value: &dyn rusqlite::ToSql) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {filter} = ?"),
                [value],
                Self::parse_account,
            )
            .optional()?;
        Ok(account)
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create(&self, account: &NewAccount) -> Result<Account> {
        if account.url.trim().is_empty() || account.username.trim().is_empty() {
            return Err(Error::InvalidInput(
                "account URL and username must not be empty".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO accounts (url, username, account_name, display_name, color, text_color)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                account.url,
                account.username,
                account.account_name,
                account.display_name,
                DEFAULT_COLOR,
                DEFAULT_TEXT_COLOR,
            ],
        )?;

        let id = AccountId::new(self.conn.last_insert_rowid());
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.query_one("id", &id.get())
    }

    fn get_by_name(&self, account_name: &str) -> Result<Option<Account>> {
        self.query_one("account_name", &account_name)
    }

    fn list(&self) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY account_name COLLATE NOCASE"
        ))?;
        let accounts = stmt
            .query_map([], Self::parse_account)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn delete(&self, id: AccountId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?", params![id.get()])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    fn update_etag(&self, id: AccountId, etag: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts SET etag = ? WHERE id = ?",
            params![etag, id.get()],
        )?;
        Ok(())
    }

    fn update_modified(&self, id: AccountId, modified: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts SET modified = ? WHERE id = ?",
            params![modified, id.get()],
        )?;
        Ok(())
    }

    fn update_api_versions(&self, id: AccountId, versions: &[ApiVersion]) -> Result<bool> {
        let raw = format_api_versions(versions);
        let rows = self.conn.execute(
            "UPDATE accounts SET api_version = ?1 WHERE id = ?2 AND api_version IS NOT ?1",
            params![raw, id.get()],
        )?;
        Ok(rows > 0)
    }

    fn update_display_name(&self, id: AccountId, display_name: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts SET display_name = ? WHERE id = ?",
            params![display_name, id.get()],
        )?;
        Ok(())
    }

    fn update_capabilities(&self, id: AccountId, capabilities: &Capabilities) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts
             SET api_version = ?, capabilities_etag = ?,
                 color = COALESCE(?, color), text_color = COALESCE(?, text_color)
             WHERE id = ?",
            params![
                format_api_versions(&capabilities.api_versions),
                capabilities.etag,
                capabilities.color,
                capabilities.text_color,
                id.get(),
            ],
        )?;
        Ok(())
    }
}
