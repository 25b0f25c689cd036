//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical record stored in the `books` collection.
//! - Define the derived read models returned by projection, grouping and
//!   explain queries.
//!
//! # Invariants
//! - `id` is assigned by the storage layer; callers never set it on insert.
//! - No uniqueness or schema constraint is enforced on `title`.

use serde::{Deserialize, Serialize};

/// Storage-assigned identifier in string form.
///
/// Hex `ObjectId` for MongoDB, v4 UUID for the embedded backend.
pub type BookId = String;

/// Canonical book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Serialized as `_id` to match document naming. `None` before insert.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub genre: String,
}

impl Book {
    /// Creates a record that has not been persisted yet.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: i32,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            year,
            genre: genre.into(),
        }
    }

    /// Compares every field except the storage identifier.
    pub fn same_fields(&self, other: &Book) -> bool {
        self.title == other.title
            && self.author == other.author
            && self.year == other.year
            && self.genre == other.genre
    }
}

/// Projection row: title and author only, identifier suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleAuthor {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

/// One group of the books-per-author aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: u64,
}

/// Backend-neutral execution statistics for one query.
///
/// Counters the backend does not report stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Plan stages from the outermost to the innermost.
    pub stages: Vec<String>,
    /// Name of the index the winning plan reads, if any.
    pub index_name: Option<String>,
    pub returned: u64,
    pub docs_examined: Option<u64>,
    pub keys_examined: Option<u64>,
    pub execution_time_ms: Option<u64>,
    /// Full statistics document as reported by the server, per-stage
    /// metrics included. `None` for the embedded backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_stats: Option<serde_json::Value>,
}

impl QueryPlan {
    pub fn uses_index(&self) -> bool {
        self.index_name.is_some()
    }
}
