//! Per-category sort order preferences
//!
//! Real categories live in `category_options` and follow their account's
//! lifetime. The pseudo-categories (recent, favorites, uncategorized) have no
//! row to hang off and are kept in the settings table instead.

use crate::error::Result;
use crate::models::{AccountId, CategorySortingMethod, NavigationCategory};
use rusqlite::{params, Connection, OptionalExtension};

use super::settings_repository::{SettingsRepository, SqliteSettingsRepository};

const SORTING_KEY_PREFIX: &str = "sorting_method";

/// Trait for category sort order storage
pub trait CategoryOptionsRepository {
    /// Sort order of a category, `SortModifiedDesc` when never set
    fn sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
    ) -> Result<CategorySortingMethod>;

    fn set_sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        method: CategorySortingMethod,
    ) -> Result<()>;

    /// Drop pseudo-category preferences of a removed account
    fn clear_account(&self, account_id: AccountId) -> Result<()>;
}

/// `SQLite` implementation of `CategoryOptionsRepository`
pub struct SqliteCategoryOptionsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCategoryOptionsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn settings(&self) -> SqliteSettingsRepository<'a> {
        SqliteSettingsRepository::new(self.conn)
    }
}

fn account_prefix(account_id: AccountId) -> String {
    format!("{SORTING_KEY_PREFIX}.{account_id}.")
}

impl CategoryOptionsRepository for SqliteCategoryOptionsRepository<'_> {
    fn sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
    ) -> Result<CategorySortingMethod> {
        let id = match (category, category.pseudo_key()) {
            (NavigationCategory::Category(name), _) => self
                .conn
                .query_row(
                    "SELECT sorting_method FROM category_options WHERE account_id = ? AND category = ?",
                    params![account_id.get(), name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?,
            (_, Some(key)) => self
                .settings()
                .get(&format!("{}{key}", account_prefix(account_id)))?
                .and_then(|value| value.parse::<i64>().ok()),
            (_, None) => None,
        };
        Ok(id.map_or_else(CategorySortingMethod::default, CategorySortingMethod::from_id))
    }

    fn set_sorting_method(
        &self,
        account_id: AccountId,
        category: &NavigationCategory,
        method: CategorySortingMethod,
    ) -> Result<()> {
        match category {
            NavigationCategory::Category(name) => {
                self.conn.execute(
                    "INSERT INTO category_options (account_id, category, sorting_method)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(account_id, category) DO UPDATE SET sorting_method = ?3",
                    params![account_id.get(), name, method.id()],
                )?;
            }
            pseudo => {
                if let Some(key) = pseudo.pseudo_key() {
                    self.settings().set(
                        &format!("{}{key}", account_prefix(account_id)),
                        &method.id().to_string(),
                    )?;
                }
            }
        }
        tracing::debug!("Sorting of {category} for account {account_id} set to {method}");
        Ok(())
    }

    fn clear_account(&self, account_id: AccountId) -> Result<()> {
        self.settings().remove_prefix(&account_prefix(account_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, Database, SqliteAccountRepository};
    use crate::models::NewAccount;

    fn setup() -> (Database, AccountId, AccountId) {
        let db = Database::open_in_memory().unwrap();
        let accounts = SqliteAccountRepository::new(db.connection());
        let alice = accounts
            .create(&NewAccount::new("https://cloud.example.com", "alice"))
            .unwrap()
            .id;
        let bob = accounts
            .create(&NewAccount::new("https://cloud.example.com", "bob"))
            .unwrap()
            .id;
        (db, alice, bob)
    }

    #[test]
    fn test_defaults_to_modified_desc() {
        let (db, alice, _) = setup();
        let repo = SqliteCategoryOptionsRepository::new(db.connection());
        for category in [
            NavigationCategory::Recent,
            NavigationCategory::Category("work".to_string()),
        ] {
            assert_eq!(
                repo.sorting_method(alice, &category).unwrap(),
                CategorySortingMethod::SortModifiedDesc
            );
        }
    }

    #[test]
    fn test_real_category_upsert() {
        let (db, alice, bob) = setup();
        let repo = SqliteCategoryOptionsRepository::new(db.connection());
        let work = NavigationCategory::Category("work".to_string());

        repo.set_sorting_method(alice, &work, CategorySortingMethod::SortLexicographicalAsc)
            .unwrap();
        assert_eq!(
            repo.sorting_method(alice, &work).unwrap(),
            CategorySortingMethod::SortLexicographicalAsc
        );
        assert_eq!(
            repo.sorting_method(bob, &work).unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );

        repo.set_sorting_method(alice, &work, CategorySortingMethod::SortModifiedDesc)
            .unwrap();
        assert_eq!(
            repo.sorting_method(alice, &work).unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );
    }

    #[test]
    fn test_pseudo_categories_are_per_account() {
        let (db, alice, bob) = setup();
        let repo = SqliteCategoryOptionsRepository::new(db.connection());

        repo.set_sorting_method(
            alice,
            &NavigationCategory::Favorites,
            CategorySortingMethod::SortLexicographicalAsc,
        )
        .unwrap();

        assert_eq!(
            repo.sorting_method(alice, &NavigationCategory::Favorites).unwrap(),
            CategorySortingMethod::SortLexicographicalAsc
        );
        assert_eq!(
            repo.sorting_method(bob, &NavigationCategory::Favorites).unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );
        assert_eq!(
            repo.sorting_method(alice, &NavigationCategory::Recent).unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );

        repo.clear_account(alice).unwrap();
        assert_eq!(
            repo.sorting_method(alice, &NavigationCategory::Favorites).unwrap(),
            CategorySortingMethod::SortModifiedDesc
        );
    }

    #[test]
    fn test_category_options_cascade_with_account() {
        let (db, alice, _) = setup();
        let repo = SqliteCategoryOptionsRepository::new(db.connection());
        let work = NavigationCategory::Category("work".to_string());
        repo.set_sorting_method(alice, &work, CategorySortingMethod::SortLexicographicalAsc)
            .unwrap();

        SqliteAccountRepository::new(db.connection())
            .delete(alice)
            .unwrap();

        let rows: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM category_options", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
