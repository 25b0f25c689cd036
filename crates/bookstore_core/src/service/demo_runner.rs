//! Sequential demo runner over the bookstore collection.
//!
//! # Responsibility
//! - Issue the scripted CRUD, query, aggregation, index and explain calls in
//!   a fixed order, one at a time.
//! - Render each result as a labelled, human-readable report section.
//!
//! # Invariants
//! - The first failing step aborts the sequence; later steps never run.
//! - The runner holds no state besides the service it drives. Connection
//!   release lives in `demo_session`.

use crate::model::book::Book;
use crate::repo::book_repo::{BookRepository, RepoError, RepoResult};
use crate::service::book_service::BookService;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::time::Instant;

pub type DemoResult<T> = Result<T, DemoError>;

/// One call of the scripted sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoStep {
    InsertOne,
    FindOne,
    UpdateOne,
    DeleteOne,
    FilterByYear,
    ProjectTitleAuthor,
    SortByYearDesc,
    CountByAuthor,
    AverageYear,
    CreateTitleIndex,
    ExplainFindOne,
}

impl DemoStep {
    /// All steps in the order the runner issues them.
    pub const ALL: [DemoStep; 11] = [
        DemoStep::InsertOne,
        DemoStep::FindOne,
        DemoStep::UpdateOne,
        DemoStep::DeleteOne,
        DemoStep::FilterByYear,
        DemoStep::ProjectTitleAuthor,
        DemoStep::SortByYearDesc,
        DemoStep::CountByAuthor,
        DemoStep::AverageYear,
        DemoStep::CreateTitleIndex,
        DemoStep::ExplainFindOne,
    ];

    /// Stable snake_case name used in log events and errors.
    pub fn name(self) -> &'static str {
        match self {
            DemoStep::InsertOne => "insert_one",
            DemoStep::FindOne => "find_one",
            DemoStep::UpdateOne => "update_one",
            DemoStep::DeleteOne => "delete_one",
            DemoStep::FilterByYear => "filter_by_year",
            DemoStep::ProjectTitleAuthor => "project_title_author",
            DemoStep::SortByYearDesc => "sort_by_year_desc",
            DemoStep::CountByAuthor => "count_by_author",
            DemoStep::AverageYear => "average_year",
            DemoStep::CreateTitleIndex => "create_title_index",
            DemoStep::ExplainFindOne => "explain_find_one",
        }
    }
}

/// Demo failure: a storage call failed or the report could not be written.
#[derive(Debug)]
pub enum DemoError {
    /// The connection could not hand out a usable repository.
    Open(RepoError),
    /// Inserting the sample catalogue failed before the sequence started.
    Seed(RepoError),
    Step { step: DemoStep, source: RepoError },
    Output(std::io::Error),
    Render(serde_json::Error),
    /// The sequence succeeded but the connection did not close cleanly.
    Release(RepoError),
}

impl Display for DemoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open repository: {err}"),
            Self::Seed(err) => write!(f, "failed to seed sample catalogue: {err}"),
            Self::Step { step, source } => write!(f, "step `{}` failed: {source}", step.name()),
            Self::Output(err) => write!(f, "failed to write report: {err}"),
            Self::Render(err) => write!(f, "failed to render report: {err}"),
            Self::Release(err) => write!(f, "failed to release connection: {err}"),
        }
    }
}

impl Error for DemoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) | Self::Seed(err) | Self::Release(err) => Some(err),
            Self::Step { source, .. } => Some(source),
            Self::Output(err) => Some(err),
            Self::Render(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for DemoError {
    fn from(value: std::io::Error) -> Self {
        Self::Output(value)
    }
}

impl From<serde_json::Error> for DemoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Render(value)
    }
}

/// Literal arguments of the scripted sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoScript {
    /// Record created by the insert step.
    pub new_book: Book,
    /// Title used by the point lookup and the explain step.
    pub lookup_title: String,
    pub update_title: String,
    pub updated_year: i32,
    pub delete_title: String,
    /// Range filter keeps records with `year > year_threshold`.
    pub year_threshold: i32,
}

impl Default for DemoScript {
    fn default() -> Self {
        Self {
            new_book: Book::new(
                "The Silent Patient",
                "Alex Michaelides",
                2019,
                "Psychological Thriller",
            ),
            lookup_title: "1984".to_string(),
            update_title: "Moby Dick".to_string(),
            updated_year: 1852,
            delete_title: "The Silent Patient".to_string(),
            year_threshold: 1950,
        }
    }
}

/// Drives the scripted sequence against one repository.
pub struct DemoRunner<R: BookRepository> {
    service: BookService<R>,
    script: DemoScript,
}

impl<R: BookRepository> DemoRunner<R> {
    pub fn new(repo: R, script: DemoScript) -> Self {
        Self {
            service: BookService::new(repo),
            script,
        }
    }

    pub fn service(&self) -> &BookService<R> {
        &self.service
    }

    /// Runs all eleven steps in order, writing the report to `out`.
    ///
    /// # Errors
    /// - `DemoError::Step` for the first storage failure; no later step runs.
    /// - `DemoError::Output`/`Render` when the report cannot be written.
    pub fn run<W: Write>(&self, out: &mut W) -> DemoResult<()> {
        let started_at = Instant::now();
        let script = &self.script;
        let service = &self.service;

        self.step(DemoStep::InsertOne, || service.insert_book(&script.new_book))?;

        let found = self.step(DemoStep::FindOne, || {
            service.find_book_by_title(&script.lookup_title)
        })?;
        write_section(out, "Found Book:", &found)?;

        self.step(DemoStep::UpdateOne, || {
            service.update_year_by_title(&script.update_title, script.updated_year)
        })?;

        self.step(DemoStep::DeleteOne, || {
            service.delete_book_by_title(&script.delete_title)
        })?;

        let recent = self.step(DemoStep::FilterByYear, || {
            service.find_published_after(script.year_threshold)
        })?;
        write_section(
            out,
            &format!("Books after {}:", script.year_threshold),
            &recent,
        )?;

        let titles = self.step(DemoStep::ProjectTitleAuthor, || {
            service.list_titles_and_authors()
        })?;
        write_section(out, "Titles and Authors:", &titles)?;

        let sorted = self.step(DemoStep::SortByYearDesc, || service.list_by_year_desc())?;
        write_section(out, "Sorted Books:", &sorted)?;

        let by_author = self.step(DemoStep::CountByAuthor, || service.count_by_author())?;
        write_section(out, "Books by Author:", &by_author)?;

        let average = self.step(DemoStep::AverageYear, || service.average_year())?;
        write_section(out, "Average Year:", &average)?;

        self.step(DemoStep::CreateTitleIndex, || service.ensure_title_index())?;
        writeln!(out, "Index created on title field.")?;

        let plan = self.step(DemoStep::ExplainFindOne, || {
            service.explain_find_by_title(&script.lookup_title)
        })?;
        write_section(out, "Execution Stats:", &plan)?;

        out.flush()?;
        info!(
            "event=demo_run module=service status=ok steps={} duration_ms={}",
            DemoStep::ALL.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn step<T>(&self, step: DemoStep, call: impl FnOnce() -> RepoResult<T>) -> DemoResult<T> {
        let started_at = Instant::now();
        match call() {
            Ok(value) => {
                info!(
                    "event=demo_step module=service status=ok step={} duration_ms={}",
                    step.name(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(source) => {
                // Error text is reported once by the session.
                warn!(
                    "event=demo_step module=service status=error step={} duration_ms={}",
                    step.name(),
                    started_at.elapsed().as_millis()
                );
                Err(DemoError::Step { step, source })
            }
        }
    }
}

fn write_section<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    label: &str,
    value: &T,
) -> DemoResult<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    writeln!(out, "{label} {rendered}")?;
    Ok(())
}
