//! One demo pass over an open connection.
//!
//! # Responsibility
//! - Obtain a repository from the connection, optionally seed it and run the
//!   scripted sequence.
//! - Report a failure once, then release the connection.
//!
//! # Invariants
//! - `release` is called exactly once, after every repository handle is
//!   dropped, whatever the outcome.
//! - A failure of the sequence takes precedence over a failure to release.

use crate::db::{close_db, MongoConnection};
use crate::model::book::Book;
use crate::repo::book_repo::{BookRepository, RepoResult, SqliteBookRepository};
use crate::repo::mongo_book_repo::MongoBookRepository;
use crate::service::demo_runner::{DemoError, DemoResult, DemoRunner, DemoScript};
use log::error;
use rusqlite::Connection;
use std::io::Write;

/// Open storage connection the demo can borrow a repository from.
pub trait DemoConnection {
    type Repository<'a>: BookRepository
    where
        Self: 'a;

    /// Borrows a repository bound to this connection.
    fn repository(&self) -> RepoResult<Self::Repository<'_>>;

    /// Closes the connection.
    fn release(self) -> RepoResult<()>;
}

impl DemoConnection for Connection {
    type Repository<'a> = SqliteBookRepository<'a>;

    fn repository(&self) -> RepoResult<Self::Repository<'_>> {
        SqliteBookRepository::try_new(self)
    }

    fn release(self) -> RepoResult<()> {
        close_db(self)?;
        Ok(())
    }
}

impl DemoConnection for MongoConnection {
    type Repository<'a> = MongoBookRepository;

    fn repository(&self) -> RepoResult<Self::Repository<'_>> {
        Ok(MongoBookRepository::new(self.database(), self.collection()))
    }

    fn release(self) -> RepoResult<()> {
        self.close();
        Ok(())
    }
}

/// Runs the demo once over `connection` and releases it afterwards.
///
/// `seed`, when given, is inserted before the first step.
///
/// # Side effects
/// - Writes the report to `out`.
/// - Logs a single `Error:` line on failure, before the connection closes.
///
/// # Errors
/// - `DemoError::Open`/`Seed` when the sequence cannot start.
/// - Any `DemoRunner::run` error.
/// - `DemoError::Release` when only the close failed.
pub fn run_demo_session<C, W>(
    connection: C,
    script: DemoScript,
    seed: Option<&[Book]>,
    out: &mut W,
) -> DemoResult<()>
where
    C: DemoConnection,
    W: Write,
{
    let outcome = run_on(&connection, script, seed, out);
    if let Err(err) = &outcome {
        error!("Error: {err}");
    }

    let released = connection.release();
    match (outcome, released) {
        (Err(err), _) => Err(err),
        (Ok(()), Err(err)) => {
            let err = DemoError::Release(err);
            error!("Error: {err}");
            Err(err)
        }
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn run_on<C, W>(
    connection: &C,
    script: DemoScript,
    seed: Option<&[Book]>,
    out: &mut W,
) -> DemoResult<()>
where
    C: DemoConnection,
    W: Write,
{
    let repo = connection.repository().map_err(DemoError::Open)?;
    let runner = DemoRunner::new(repo, script);
    if let Some(books) = seed {
        runner
            .service()
            .seed_catalogue(books)
            .map_err(DemoError::Seed)?;
    }
    runner.run(out)
}
