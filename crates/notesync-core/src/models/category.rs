//! Navigation categories and their sort order

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How notes inside a category are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySortingMethod {
    /// Most recently modified first
    #[default]
    SortModifiedDesc,
    /// Alphabetically by title, case-insensitive
    SortLexicographicalAsc,
}

impl CategorySortingMethod {
    /// Stable numeric id used in storage
    pub const fn id(self) -> i64 {
        match self {
            Self::SortModifiedDesc => 0,
            Self::SortLexicographicalAsc => 1,
        }
    }

    /// Unknown ids fall back to the default
    pub const fn from_id(id: i64) -> Self {
        match id {
            1 => Self::SortLexicographicalAsc,
            _ => Self::SortModifiedDesc,
        }
    }

    /// `ORDER BY` term applied after the favorites-first ordering
    pub(crate) const fn order_clause(self) -> &'static str {
        match self {
            Self::SortModifiedDesc => "modified DESC",
            Self::SortLexicographicalAsc => "title COLLATE NOCASE ASC",
        }
    }
}

impl FromStr for CategorySortingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modified" | "modified-desc" | "0" => Ok(Self::SortModifiedDesc),
            "title" | "alphabetical" | "lexicographical" | "1" => Ok(Self::SortLexicographicalAsc),
            other => Err(format!("unknown sorting method '{other}'")),
        }
    }
}

impl fmt::Display for CategorySortingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SortModifiedDesc => f.write_str("modified"),
            Self::SortLexicographicalAsc => f.write_str("title"),
        }
    }
}

/// A selectable entry in the category navigation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NavigationCategory {
    /// All notes
    Recent,
    Favorites,
    /// Notes with an empty category
    Uncategorized,
    /// A real category, including its sub-categories
    Category(String),
}

impl NavigationCategory {
    /// Key suffix under which pseudo-categories keep their sort order
    pub(crate) const fn pseudo_key(&self) -> Option<&'static str> {
        match self {
            Self::Recent => Some("recent"),
            Self::Favorites => Some("favorites"),
            Self::Uncategorized => Some("uncategorized"),
            Self::Category(_) => None,
        }
    }
}

impl FromStr for NavigationCategory {
    type Err = String;

    /// `@recent`, `@favorites` and `@uncategorized` select the pseudo-categories.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "@recent" => Ok(Self::Recent),
            "@favorites" => Ok(Self::Favorites),
            "@uncategorized" => Ok(Self::Uncategorized),
            other => Ok(Self::Category(other.trim_matches('/').to_string())),
        }
    }
}

impl fmt::Display for NavigationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recent => f.write_str("@recent"),
            Self::Favorites => f.write_str("@favorites"),
            Self::Uncategorized => f.write_str("@uncategorized"),
            Self::Category(name) => f.write_str(name),
        }
    }
}
