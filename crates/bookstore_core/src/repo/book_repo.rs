//! Book repository contract and embedded SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, filter, projection, sort, aggregation, index and explain
//!   APIs over the canonical `books` storage.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Natural order is insertion order (`rowid`).
//! - Point update/delete pick the first matching row in natural order.
//! - Grouped counts break ties by author name ascending.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::book::{AuthorCount, Book, BookId, QueryPlan, TitleAuthor};
use rusqlite::{params, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Name given to the ascending `title` index on every backend.
pub const TITLE_INDEX_NAME: &str = "title_1";

const BOOK_SELECT_SQL: &str = "SELECT id, title, author, year, genre FROM books";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for book persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    /// Connection schema is older than the binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted book data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is older than required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<mongodb::error::Error> for RepoError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Db(DbError::Mongo(value))
    }
}

/// Repository interface for the bookstore collection.
pub trait BookRepository {
    /// Persists a new record and returns the storage-assigned id.
    fn insert_book(&self, book: &Book) -> RepoResult<BookId>;
    /// Returns the first record whose title equals `title`.
    fn find_book_by_title(&self, title: &str) -> RepoResult<Option<Book>>;
    /// Sets `year` on the first record whose title equals `title`.
    fn update_year_by_title(&self, title: &str, year: i32) -> RepoResult<()>;
    /// Removes the first record whose title equals `title`.
    fn delete_book_by_title(&self, title: &str) -> RepoResult<()>;
    /// Returns every record with `year > threshold`.
    fn find_published_after(&self, threshold: i32) -> RepoResult<Vec<Book>>;
    fn list_titles_and_authors(&self) -> RepoResult<Vec<TitleAuthor>>;
    fn list_by_year_desc(&self) -> RepoResult<Vec<Book>>;
    /// Groups records by author, ordered by count descending.
    fn count_by_author(&self) -> RepoResult<Vec<AuthorCount>>;
    /// Mean of `year`; `None` for an empty collection.
    fn average_year(&self) -> RepoResult<Option<f64>>;
    /// Creates the ascending `title` index if absent and returns its name.
    fn ensure_title_index(&self) -> RepoResult<String>;
    /// Runs the title lookup in execution-statistics mode.
    fn explain_find_by_title(&self, title: &str) -> RepoResult<QueryPlan>;
}

impl<R: BookRepository + ?Sized> BookRepository for &R {
    fn insert_book(&self, book: &Book) -> RepoResult<BookId> {
        (**self).insert_book(book)
    }

    fn find_book_by_title(&self, title: &str) -> RepoResult<Option<Book>> {
        (**self).find_book_by_title(title)
    }

    fn update_year_by_title(&self, title: &str, year: i32) -> RepoResult<()> {
        (**self).update_year_by_title(title, year)
    }

    fn delete_book_by_title(&self, title: &str) -> RepoResult<()> {
        (**self).delete_book_by_title(title)
    }

    fn find_published_after(&self, threshold: i32) -> RepoResult<Vec<Book>> {
        (**self).find_published_after(threshold)
    }

    fn list_titles_and_authors(&self) -> RepoResult<Vec<TitleAuthor>> {
        (**self).list_titles_and_authors()
    }

    fn list_by_year_desc(&self) -> RepoResult<Vec<Book>> {
        (**self).list_by_year_desc()
    }

    fn count_by_author(&self) -> RepoResult<Vec<AuthorCount>> {
        (**self).count_by_author()
    }

    fn average_year(&self) -> RepoResult<Option<f64>> {
        (**self).average_year()
    }

    fn ensure_title_index(&self) -> RepoResult<String> {
        (**self).ensure_title_index()
    }

    fn explain_find_by_title(&self, title: &str) -> RepoResult<QueryPlan> {
        (**self).explain_find_by_title(title)
    }
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Wraps a connection after checking that migrations have been applied.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is behind this binary.
    /// - `MissingRequiredTable("books")` when the table does not exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version < expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_books: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'books'
            );",
            [],
            |row| row.get(0),
        )?;
        if !has_books {
            return Err(RepoError::MissingRequiredTable("books"));
        }

        Ok(Self { conn })
    }

    fn query_books<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut books = Vec::new();

        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }

        Ok(books)
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn insert_book(&self, book: &Book) -> RepoResult<BookId> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO books (id, title, author, year, genre)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.as_str(),
                book.title.as_str(),
                book.author.as_str(),
                book.year,
                book.genre.as_str(),
            ],
        )?;

        Ok(id)
    }

    fn find_book_by_title(&self, title: &str) -> RepoResult<Option<Book>> {
        let mut stmt = self.conn.prepare(&find_by_title_sql())?;
        let mut rows = stmt.query([title])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }

        Ok(None)
    }

    fn update_year_by_title(&self, title: &str, year: i32) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE books
             SET year = ?1
             WHERE rowid = (SELECT rowid FROM books WHERE title = ?2 ORDER BY rowid LIMIT 1);",
            params![year, title],
        )?;
        Ok(())
    }

    fn delete_book_by_title(&self, title: &str) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM books
             WHERE rowid = (SELECT rowid FROM books WHERE title = ?1 ORDER BY rowid LIMIT 1);",
            [title],
        )?;
        Ok(())
    }

    fn find_published_after(&self, threshold: i32) -> RepoResult<Vec<Book>> {
        self.query_books(
            &format!("{BOOK_SELECT_SQL} WHERE year > ?1 ORDER BY rowid ASC;"),
            [threshold],
        )
    }

    fn list_titles_and_authors(&self) -> RepoResult<Vec<TitleAuthor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title, author FROM books ORDER BY rowid ASC;")?;
        let rows = stmt.query_map([], |row| {
            Ok(TitleAuthor {
                title: row.get("title")?,
                author: row.get("author")?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_by_year_desc(&self) -> RepoResult<Vec<Book>> {
        self.query_books(
            &format!("{BOOK_SELECT_SQL} ORDER BY year DESC, rowid ASC;"),
            [],
        )
    }

    fn count_by_author(&self) -> RepoResult<Vec<AuthorCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT author, COUNT(*) AS count
             FROM books
             GROUP BY author
             ORDER BY count DESC, author ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut groups = Vec::new();

        while let Some(row) = rows.next()? {
            let author: String = row.get("author")?;
            let count: i64 = row.get("count")?;
            let count = u64::try_from(count).map_err(|_| {
                RepoError::InvalidData(format!("negative group count {count} for `{author}`"))
            })?;
            groups.push(AuthorCount { author, count });
        }

        Ok(groups)
    }

    fn average_year(&self) -> RepoResult<Option<f64>> {
        let average = self
            .conn
            .query_row("SELECT AVG(year) FROM books;", [], |row| {
                row.get::<_, Option<f64>>(0)
            })?;
        Ok(average)
    }

    fn ensure_title_index(&self) -> RepoResult<String> {
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {TITLE_INDEX_NAME} ON books (title);"
        ))?;
        Ok(TITLE_INDEX_NAME.to_string())
    }

    fn explain_find_by_title(&self, title: &str) -> RepoResult<QueryPlan> {
        let sql = find_by_title_sql();
        let mut plan_stmt = self.conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        let stages = plan_stmt
            .query_map([title], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()?;
        let index_name = stages
            .iter()
            .find_map(|detail| index_name_from_detail(detail));

        let started_at = Instant::now();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([title])?;
        let mut returned = 0_u64;
        while rows.next()?.is_some() {
            returned += 1;
        }
        let elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(QueryPlan {
            stages,
            index_name,
            returned,
            docs_examined: None,
            keys_examined: None,
            execution_time_ms: Some(elapsed_ms),
            execution_stats: None,
        })
    }
}

fn find_by_title_sql() -> String {
    format!("{BOOK_SELECT_SQL} WHERE title = ?1 LIMIT 1;")
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    Ok(Book {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        author: row.get("author")?,
        year: row.get("year")?,
        genre: row.get("genre")?,
    })
}

/// Extracts the index name from one `EXPLAIN QUERY PLAN` detail line.
fn index_name_from_detail(detail: &str) -> Option<String> {
    ["USING COVERING INDEX ", "USING INDEX "]
        .iter()
        .find_map(|marker| {
            let start = detail.find(marker)? + marker.len();
            detail[start..]
                .split_whitespace()
                .next()
                .map(str::to_string)
        })
}
