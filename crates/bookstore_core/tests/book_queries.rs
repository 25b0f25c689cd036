use bookstore_core::db::open_db_in_memory;
use bookstore_core::{
    sample_books, AuthorCount, Book, BookRepository, BookService, SqliteBookRepository,
    TITLE_INDEX_NAME,
};
use std::collections::HashMap;

fn seeded_service(conn: &rusqlite::Connection) -> BookService<SqliteBookRepository<'_>> {
    let service = BookService::new(SqliteBookRepository::try_new(conn).unwrap());
    service.seed_catalogue(&sample_books()).unwrap();
    service
}

#[test]
fn range_filter_returns_exactly_books_after_threshold() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let recent = service.find_published_after(1950).unwrap();
    let expected: Vec<String> = sample_books()
        .into_iter()
        .filter(|book| book.year > 1950)
        .map(|book| book.title)
        .collect();

    assert!(recent.iter().all(|book| book.year > 1950));
    assert_eq!(
        recent.into_iter().map(|book| book.title).collect::<Vec<_>>(),
        expected
    );
}

#[test]
fn range_filter_sees_insert_after_empty_result() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    repo.insert_book(&Book::new("1984", "George Orwell", 1949, "Dystopian"))
        .unwrap();
    repo.insert_book(&Book::new("Moby Dick", "Herman Melville", 1851, "Adventure"))
        .unwrap();
    assert!(repo.find_published_after(1950).unwrap().is_empty());

    let patient = Book::new(
        "The Silent Patient",
        "Alex Michaelides",
        2019,
        "Psychological Thriller",
    );
    repo.insert_book(&patient).unwrap();

    let recent = repo.find_published_after(1950).unwrap();
    assert_eq!(recent.len(), 1);
    assert!(recent[0].same_fields(&patient));
}

#[test]
fn range_filter_is_strictly_greater_than() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    repo.insert_book(&Book::new("Edge", "A", 1950, "x")).unwrap();
    assert!(repo.find_published_after(1950).unwrap().is_empty());
}

#[test]
fn projection_serializes_only_title_and_author() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let rows = service.list_titles_and_authors().unwrap();
    assert_eq!(rows.len(), sample_books().len());

    for row in rows {
        let value = serde_json::to_value(&row).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(value.get("title").is_some());
        assert!(value.get("author").is_some());
        assert!(value.get("_id").is_none());
        assert!(value.get("genre").is_none());
        assert!(value.get("year").is_none());
    }
}

#[test]
fn sort_by_year_is_non_increasing() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let sorted = service.list_by_year_desc().unwrap();
    assert_eq!(sorted.len(), sample_books().len());
    assert!(sorted.windows(2).all(|pair| pair[0].year >= pair[1].year));
    assert_eq!(sorted[0].title, "The Alchemist");
    assert_eq!(sorted[sorted.len() - 1].title, "Pride and Prejudice");
}

#[test]
fn count_by_author_has_one_row_per_author_ordered_by_count() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let groups = service.count_by_author().unwrap();

    let mut expected: HashMap<String, u64> = HashMap::new();
    for book in sample_books() {
        *expected.entry(book.author).or_default() += 1;
    }
    assert_eq!(groups.len(), expected.len());
    for group in &groups {
        assert_eq!(expected.get(&group.author), Some(&group.count));
    }
    assert!(groups.windows(2).all(|pair| pair[0].count >= pair[1].count));

    // Two authors have two books each; ties sort by name.
    assert_eq!(
        groups[..2],
        [
            AuthorCount {
                author: "George Orwell".to_string(),
                count: 2,
            },
            AuthorCount {
                author: "J.R.R. Tolkien".to_string(),
                count: 2,
            },
        ]
    );
}

#[test]
fn average_year_is_mean_or_none_when_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    assert_eq!(repo.average_year().unwrap(), None);

    repo.insert_book(&Book::new("1984", "George Orwell", 1949, "Dystopian"))
        .unwrap();
    repo.insert_book(&Book::new("Moby Dick", "Herman Melville", 1852, "Adventure"))
        .unwrap();

    let average = repo.average_year().unwrap().unwrap();
    assert!((average - 1900.5).abs() < f64::EPSILON);
}

#[test]
fn title_index_is_idempotent_and_used_by_explain() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let before = service.explain_find_by_title("1984").unwrap();
    assert!(!before.uses_index());
    assert_eq!(before.returned, 1);
    assert!(!before.stages.is_empty());

    assert_eq!(service.ensure_title_index().unwrap(), TITLE_INDEX_NAME);
    assert_eq!(service.ensure_title_index().unwrap(), TITLE_INDEX_NAME);

    let after = service.explain_find_by_title("1984").unwrap();
    assert_eq!(after.index_name.as_deref(), Some(TITLE_INDEX_NAME));
    assert_eq!(after.returned, 1);
    assert!(after.execution_time_ms.is_some());
}

#[test]
fn explain_of_unknown_title_returns_zero_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn);

    let plan = service.explain_find_by_title("Missing").unwrap();
    assert_eq!(plan.returned, 0);
    assert!(plan.execution_stats.is_none());
}
