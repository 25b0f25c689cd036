//! MongoDB implementation of the book repository.
//!
//! # Responsibility
//! - Translate repository calls into single driver calls on one collection.
//! - Map stored documents (including loosely typed ones) into `Book`.
//!
//! # Invariants
//! - Every method issues exactly one server command.
//! - Stored `year` values may be int32, int64 or integral doubles.

use crate::model::book::{AuthorCount, Book, BookId, QueryPlan, TitleAuthor};
use crate::repo::book_repo::{BookRepository, RepoError, RepoResult};
use mongodb::bson::{doc, Bson, Document};
use mongodb::sync::{Collection, Cursor, Database};
use mongodb::IndexModel;
use serde::{Deserialize, Deserializer, Serialize};

/// Stored shape of one book document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<Bson>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default, deserialize_with = "deserialize_year")]
    year: i32,
    #[serde(default)]
    genre: String,
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: None,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            genre: book.genre.clone(),
        }
    }
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Self {
            id: document.id.as_ref().map(id_to_string),
            title: document.title,
            author: document.author,
            year: document.year,
            genre: document.genre,
        }
    }
}

/// MongoDB-backed book repository bound to one collection.
pub struct MongoBookRepository {
    database: Database,
    collection: String,
}

impl MongoBookRepository {
    pub fn new(database: Database, collection: impl Into<String>) -> Self {
        Self {
            database,
            collection: collection.into(),
        }
    }

    fn books(&self) -> Collection<BookDocument> {
        self.database.collection(&self.collection)
    }
}

impl BookRepository for MongoBookRepository {
    fn insert_book(&self, book: &Book) -> RepoResult<BookId> {
        let result = self.books().insert_one(BookDocument::from(book)).run()?;
        Ok(id_to_string(&result.inserted_id))
    }

    fn find_book_by_title(&self, title: &str) -> RepoResult<Option<Book>> {
        let found = self.books().find_one(title_filter(title)).run()?;
        Ok(found.map(Book::from))
    }

    fn update_year_by_title(&self, title: &str, year: i32) -> RepoResult<()> {
        self.books()
            .update_one(title_filter(title), set_year_update(year))
            .run()?;
        Ok(())
    }

    fn delete_book_by_title(&self, title: &str) -> RepoResult<()> {
        self.books().delete_one(title_filter(title)).run()?;
        Ok(())
    }

    fn find_published_after(&self, threshold: i32) -> RepoResult<Vec<Book>> {
        let cursor = self
            .books()
            .find(published_after_filter(threshold))
            .run()?;
        collect_books(cursor)
    }

    fn list_titles_and_authors(&self) -> RepoResult<Vec<TitleAuthor>> {
        let cursor = self
            .database
            .collection::<TitleAuthor>(&self.collection)
            .find(doc! {})
            .projection(title_author_projection())
            .run()?;

        let mut rows = Vec::new();
        for row in cursor {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn list_by_year_desc(&self) -> RepoResult<Vec<Book>> {
        let cursor = self.books().find(doc! {}).sort(year_desc_sort()).run()?;
        collect_books(cursor)
    }

    fn count_by_author(&self) -> RepoResult<Vec<AuthorCount>> {
        let cursor = self.books().aggregate(count_by_author_pipeline()).run()?;

        let mut groups = Vec::new();
        for group in cursor {
            groups.push(author_count_from_document(&group?)?);
        }
        Ok(groups)
    }

    fn average_year(&self) -> RepoResult<Option<f64>> {
        let mut cursor = self.books().aggregate(average_year_pipeline()).run()?;
        match cursor.next() {
            Some(row) => Ok(row?.get("avgYear").and_then(Bson::as_f64)),
            None => Ok(None),
        }
    }

    fn ensure_title_index(&self) -> RepoResult<String> {
        let result = self.books().create_index(title_index_model()).run()?;
        Ok(result.index_name)
    }

    fn explain_find_by_title(&self, title: &str) -> RepoResult<QueryPlan> {
        let explain = self
            .database
            .run_command(explain_find_command(&self.collection, title))
            .run()?;
        plan_from_explain(&explain)
    }
}

fn collect_books(cursor: Cursor<BookDocument>) -> RepoResult<Vec<Book>> {
    let mut books = Vec::new();
    for document in cursor {
        books.push(Book::from(document?));
    }
    Ok(books)
}

fn title_filter(title: &str) -> Document {
    doc! { "title": title }
}

fn set_year_update(year: i32) -> Document {
    doc! { "$set": { "year": year } }
}

fn published_after_filter(threshold: i32) -> Document {
    doc! { "year": { "$gt": threshold } }
}

fn title_author_projection() -> Document {
    doc! { "title": 1, "author": 1, "_id": 0 }
}

fn year_desc_sort() -> Document {
    doc! { "year": -1 }
}

fn count_by_author_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$author", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1 } },
    ]
}

fn average_year_pipeline() -> Vec<Document> {
    vec![doc! { "$group": { "_id": Bson::Null, "avgYear": { "$avg": "$year" } } }]
}

fn title_index_model() -> IndexModel {
    IndexModel::builder().keys(doc! { "title": 1 }).build()
}

fn explain_find_command(collection: &str, title: &str) -> Document {
    doc! {
        "explain": { "find": collection, "filter": title_filter(title) },
        "verbosity": "executionStats",
    }
}

fn author_count_from_document(group: &Document) -> RepoResult<AuthorCount> {
    let author = match group.get("_id") {
        Some(Bson::String(author)) => author.clone(),
        Some(Bson::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let count = group
        .get("count")
        .and_then(non_negative_count)
        .ok_or_else(|| RepoError::InvalidData(format!("group `{author}` has no usable count")))?;

    Ok(AuthorCount { author, count })
}

/// Converts `explain` output in `executionStats` verbosity into a plan.
fn plan_from_explain(explain: &Document) -> RepoResult<QueryPlan> {
    let stats = explain.get_document("executionStats").map_err(|_| {
        RepoError::InvalidData("explain output has no executionStats section".to_string())
    })?;

    let mut stages = Vec::new();
    let mut index_name = None;
    if let Ok(root) = stats.get_document("executionStages") {
        walk_stages(root, &mut stages, &mut index_name);
    }
    if index_name.is_none() {
        if let Ok(winning_plan) = explain
            .get_document("queryPlanner")
            .and_then(|planner| planner.get_document("winningPlan"))
        {
            walk_stages(winning_plan, &mut Vec::new(), &mut index_name);
        }
    }

    Ok(QueryPlan {
        stages,
        index_name,
        returned: counter(stats, "nReturned").unwrap_or(0),
        docs_examined: counter(stats, "totalDocsExamined"),
        keys_examined: counter(stats, "totalKeysExamined"),
        execution_time_ms: counter(stats, "executionTimeMillis"),
        execution_stats: Some(Bson::Document(stats.clone()).into_relaxed_extjson()),
    })
}

fn walk_stages(stage: &Document, stages: &mut Vec<String>, index_name: &mut Option<String>) {
    if let Ok(name) = stage.get_str("stage") {
        stages.push(name.to_string());
    }
    if index_name.is_none() {
        if let Ok(name) = stage.get_str("indexName") {
            *index_name = Some(name.to_string());
        }
    }

    // Classic plans nest through inputStage(s); SBE plans wrap them in queryPlan.
    for key in ["inputStage", "queryPlan"] {
        if let Ok(child) = stage.get_document(key) {
            walk_stages(child, stages, index_name);
        }
    }
    if let Ok(children) = stage.get_array("inputStages") {
        for child in children.iter().filter_map(Bson::as_document) {
            walk_stages(child, stages, index_name);
        }
    }
}

fn counter(document: &Document, key: &str) -> Option<u64> {
    document.get(key).and_then(non_negative_count)
}

fn non_negative_count(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(value) => u64::try_from(*value).ok(),
        Bson::Int64(value) => u64::try_from(*value).ok(),
        Bson::Double(value) if *value >= 0.0 && value.fract() == 0.0 => Some(*value as u64),
        _ => None,
    }
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Bson::deserialize(deserializer)?;
    year_from_bson(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("unsupported year value `{value}`")))
}

fn year_from_bson(value: &Bson) -> Option<i32> {
    match value {
        Bson::Int32(year) => Some(*year),
        Bson::Int64(year) => i32::try_from(*year).ok(),
        Bson::Double(year)
            if year.fract() == 0.0
                && *year >= f64::from(i32::MIN)
                && *year <= f64::from(i32::MAX) =>
        {
            Some(*year as i32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn filters_match_driver_shapes() {
        assert_eq!(title_filter("1984"), doc! { "title": "1984" });
        assert_eq!(set_year_update(1852), doc! { "$set": { "year": 1852 } });
        assert_eq!(
            published_after_filter(1950),
            doc! { "year": { "$gt": 1950 } }
        );
        assert_eq!(
            title_author_projection(),
            doc! { "title": 1, "author": 1, "_id": 0 }
        );
        assert_eq!(year_desc_sort(), doc! { "year": -1 });
    }

    #[test]
    fn pipelines_group_then_sort() {
        let by_author = count_by_author_pipeline();
        assert_eq!(by_author.len(), 2);
        assert!(by_author[0].contains_key("$group"));
        assert_eq!(by_author[1], doc! { "$sort": { "count": -1 } });

        let average = average_year_pipeline();
        let group = average[0].get_document("$group").unwrap();
        assert_eq!(group.get("_id"), Some(&Bson::Null));
        assert_eq!(
            group.get_document("avgYear").unwrap(),
            &doc! { "$avg": "$year" }
        );
    }

    #[test]
    fn explain_command_wraps_find_with_execution_stats() {
        let command = explain_find_command("books", "1984");
        let inner = command.get_document("explain").unwrap();
        assert_eq!(inner.get_str("find").unwrap(), "books");
        assert_eq!(inner.get_document("filter").unwrap(), &doc! { "title": "1984" });
        assert_eq!(command.get_str("verbosity").unwrap(), "executionStats");
    }

    #[test]
    fn plan_reads_counters_and_index_from_classic_stages() {
        let explain = doc! {
            "executionStats": {
                "nReturned": 1,
                "executionTimeMillis": 3,
                "totalKeysExamined": 1,
                "totalDocsExamined": Bson::Int64(1),
                "executionStages": {
                    "stage": "FETCH",
                    "inputStage": { "stage": "IXSCAN", "indexName": "title_1" },
                },
            },
        };

        let plan = plan_from_explain(&explain).unwrap();
        assert_eq!(plan.stages, vec!["FETCH".to_string(), "IXSCAN".to_string()]);
        assert_eq!(plan.index_name.as_deref(), Some("title_1"));
        assert_eq!(plan.returned, 1);
        assert_eq!(plan.docs_examined, Some(1));
        assert_eq!(plan.keys_examined, Some(1));
        assert_eq!(plan.execution_time_ms, Some(3));

        let stats = plan.execution_stats.unwrap();
        assert_eq!(stats["nReturned"], 1);
        assert_eq!(stats["executionStages"]["inputStage"]["indexName"], "title_1");
    }

    #[test]
    fn plan_falls_back_to_winning_plan_for_index_name() {
        let explain = doc! {
            "queryPlanner": {
                "winningPlan": {
                    "queryPlan": {
                        "stage": "FETCH",
                        "inputStage": { "stage": "IXSCAN", "indexName": "title_1" },
                    },
                },
            },
            "executionStats": {
                "nReturned": 0,
                "totalDocsExamined": 0,
                "executionStages": { "stage": "nlj" },
            },
        };

        let plan = plan_from_explain(&explain).unwrap();
        assert_eq!(plan.stages, vec!["nlj".to_string()]);
        assert_eq!(plan.index_name.as_deref(), Some("title_1"));
        assert_eq!(plan.keys_examined, None);
    }

    #[test]
    fn plan_without_execution_stats_is_invalid_data() {
        let err = plan_from_explain(&doc! { "ok": 1 }).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn author_group_maps_id_to_author() {
        let group = author_count_from_document(&doc! { "_id": "George Orwell", "count": 2 })
            .unwrap();
        assert_eq!(
            group,
            AuthorCount {
                author: "George Orwell".to_string(),
                count: 2,
            }
        );

        let missing = author_count_from_document(&doc! { "_id": "Nobody" }).unwrap_err();
        assert!(matches!(missing, RepoError::InvalidData(_)));
    }

    #[test]
    fn book_document_accepts_double_year_and_missing_genre() {
        let oid = ObjectId::new();
        let stored = doc! {
            "_id": oid,
            "title": "1984",
            "author": "George Orwell",
            "year": 1949.0,
        };

        let document: BookDocument = mongodb::bson::from_document(stored).unwrap();
        let book = Book::from(document);
        assert_eq!(book.id.as_deref(), Some(oid.to_hex().as_str()));
        assert_eq!(book.year, 1949);
        assert_eq!(book.genre, "");
    }

    #[test]
    fn book_document_rejects_fractional_year() {
        let stored = doc! { "title": "x", "author": "y", "year": 1949.5, "genre": "z" };
        assert!(mongodb::bson::from_document::<BookDocument>(stored).is_err());
    }

    #[test]
    fn new_document_omits_id() {
        let book = Book::new("The Silent Patient", "Alex Michaelides", 2019, "Thriller");
        let document = mongodb::bson::to_document(&BookDocument::from(&book)).unwrap();
        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_i32("year").unwrap(), 2019);
    }
}
