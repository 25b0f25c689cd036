//! Core logic for the bookstore demo.
//! Owns the book model, both storage backends and the scripted demo runner.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::BookstoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{AuthorCount, Book, BookId, QueryPlan, TitleAuthor};
pub use model::catalogue::sample_books;
pub use repo::book_repo::{
    BookRepository, RepoError, RepoResult, SqliteBookRepository, TITLE_INDEX_NAME,
};
pub use repo::mongo_book_repo::MongoBookRepository;
pub use service::book_service::BookService;
pub use service::demo_runner::{DemoError, DemoResult, DemoRunner, DemoScript, DemoStep};
pub use service::demo_session::{run_demo_session, DemoConnection};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
