use bookstore_core::db::migrations::latest_version;
use bookstore_core::db::open_db_in_memory;
use bookstore_core::{sample_books, Book, BookRepository, BookService, RepoError, SqliteBookRepository};
use rusqlite::Connection;

#[test]
fn insert_then_lookup_returns_inserted_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = Book::new(
        "The Silent Patient",
        "Alex Michaelides",
        2019,
        "Psychological Thriller",
    );
    let id = repo.insert_book(&book).unwrap();

    let loaded = repo.find_book_by_title("The Silent Patient").unwrap().unwrap();
    assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
    assert!(loaded.same_fields(&book));
}

#[test]
fn lookup_of_unknown_title_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    assert!(repo.find_book_by_title("1984").unwrap().is_none());
}

#[test]
fn insert_does_not_check_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = Book::new("1984", "George Orwell", 1949, "Dystopian");
    let first = repo.insert_book(&book).unwrap();
    let second = repo.insert_book(&book).unwrap();

    assert_ne!(first, second);
    assert_eq!(repo.find_published_after(0).unwrap().len(), 2);
}

#[test]
fn update_changes_year_and_keeps_other_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = Book::new("Moby Dick", "Herman Melville", 1851, "Adventure");
    repo.insert_book(&book).unwrap();
    repo.update_year_by_title("Moby Dick", 1852).unwrap();

    let loaded = repo.find_book_by_title("Moby Dick").unwrap().unwrap();
    assert_eq!(loaded.year, 1852);
    assert_eq!(loaded.title, book.title);
    assert_eq!(loaded.author, book.author);
    assert_eq!(loaded.genre, book.genre);
}

#[test]
fn update_touches_only_first_match() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    repo.insert_book(&Book::new("Twin", "A", 1900, "x")).unwrap();
    repo.insert_book(&Book::new("Twin", "B", 1900, "x")).unwrap();
    repo.update_year_by_title("Twin", 2000).unwrap();

    let years: Vec<(String, i32)> = repo
        .find_published_after(0)
        .unwrap()
        .into_iter()
        .map(|book| (book.author, book.year))
        .collect();
    assert_eq!(
        years,
        vec![("A".to_string(), 2000), ("B".to_string(), 1900)]
    );
}

#[test]
fn update_and_delete_without_match_are_no_ops() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    repo.insert_book(&Book::new("1984", "George Orwell", 1949, "Dystopian"))
        .unwrap();

    repo.update_year_by_title("Missing", 1).unwrap();
    repo.delete_book_by_title("Missing").unwrap();

    let loaded = repo.find_book_by_title("1984").unwrap().unwrap();
    assert_eq!(loaded.year, 1949);
}

#[test]
fn delete_makes_lookup_return_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    repo.insert_book(&Book::new(
        "The Silent Patient",
        "Alex Michaelides",
        2019,
        "Psychological Thriller",
    ))
    .unwrap();
    repo.delete_book_by_title("The Silent Patient").unwrap();

    assert!(repo
        .find_book_by_title("The Silent Patient")
        .unwrap()
        .is_none());
}

#[test]
fn delete_removes_one_record_per_call() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let book = Book::new("Twin", "A", 1900, "x");
    repo.insert_book(&book).unwrap();
    repo.insert_book(&book).unwrap();

    repo.delete_book_by_title("Twin").unwrap();
    assert!(repo.find_book_by_title("Twin").unwrap().is_some());

    repo.delete_book_by_title("Twin").unwrap();
    assert!(repo.find_book_by_title("Twin").unwrap().is_none());
}

#[test]
fn service_seeds_catalogue_in_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let service = BookService::new(repo);

    let catalogue = sample_books();
    let ids = service.seed_catalogue(&catalogue).unwrap();
    assert_eq!(ids.len(), catalogue.len());

    let titles: Vec<String> = service
        .list_titles_and_authors()
        .unwrap()
        .into_iter()
        .map(|row| row.title)
        .collect();
    let expected: Vec<String> = catalogue.into_iter().map(|book| book.title).collect();
    assert_eq!(titles, expected);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteBookRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_books_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteBookRepository::try_new(&conn);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("books"))));
}
