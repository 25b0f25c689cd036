//! Book use-case service.
//!
//! # Responsibility
//! - Provide stable entry points for core callers.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository contracts.
//! - Service layer remains storage-agnostic.

use crate::model::book::{AuthorCount, Book, BookId, QueryPlan, TitleAuthor};
use crate::repo::book_repo::{BookRepository, RepoResult};
use log::info;

/// Use-case service wrapper for bookstore operations.
pub struct BookService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> BookService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the wrapped repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Inserts every record of `books` in order.
    ///
    /// # Contract
    /// - Stops at the first failing insert; earlier inserts stay persisted.
    /// - Returns created ids in input order.
    pub fn seed_catalogue(&self, books: &[Book]) -> RepoResult<Vec<BookId>> {
        let mut ids = Vec::with_capacity(books.len());
        for book in books {
            ids.push(self.repo.insert_book(book)?);
        }
        info!(
            "event=catalogue_seed module=service status=ok inserted={}",
            ids.len()
        );
        Ok(ids)
    }

    pub fn insert_book(&self, book: &Book) -> RepoResult<BookId> {
        self.repo.insert_book(book)
    }

    pub fn find_book_by_title(&self, title: &str) -> RepoResult<Option<Book>> {
        self.repo.find_book_by_title(title)
    }

    /// Sets the publication year of the first matching title.
    ///
    /// No error and no count when nothing matches.
    pub fn update_year_by_title(&self, title: &str, year: i32) -> RepoResult<()> {
        self.repo.update_year_by_title(title, year)
    }

    pub fn delete_book_by_title(&self, title: &str) -> RepoResult<()> {
        self.repo.delete_book_by_title(title)
    }

    pub fn find_published_after(&self, threshold: i32) -> RepoResult<Vec<Book>> {
        self.repo.find_published_after(threshold)
    }

    pub fn list_titles_and_authors(&self) -> RepoResult<Vec<TitleAuthor>> {
        self.repo.list_titles_and_authors()
    }

    pub fn list_by_year_desc(&self) -> RepoResult<Vec<Book>> {
        self.repo.list_by_year_desc()
    }

    pub fn count_by_author(&self) -> RepoResult<Vec<AuthorCount>> {
        self.repo.count_by_author()
    }

    pub fn average_year(&self) -> RepoResult<Option<f64>> {
        self.repo.average_year()
    }

    pub fn ensure_title_index(&self) -> RepoResult<String> {
        self.repo.ensure_title_index()
    }

    pub fn explain_find_by_title(&self, title: &str) -> RepoResult<QueryPlan> {
        self.repo.explain_find_by_title(title)
    }
}
