//! Sample catalogue used to populate an empty `books` collection.

use crate::model::book::Book;

/// Returns the twelve-record bookstore catalogue in insertion order.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("To Kill a Mockingbird", "Harper Lee", 1960, "Fiction"),
        Book::new("1984", "George Orwell", 1949, "Dystopian"),
        Book::new("The Great Gatsby", "F. Scott Fitzgerald", 1925, "Fiction"),
        Book::new("Brave New World", "Aldous Huxley", 1932, "Dystopian"),
        Book::new("The Hobbit", "J.R.R. Tolkien", 1937, "Fantasy"),
        Book::new("The Catcher in the Rye", "J.D. Salinger", 1951, "Fiction"),
        Book::new("Pride and Prejudice", "Jane Austen", 1813, "Romance"),
        Book::new("The Lord of the Rings", "J.R.R. Tolkien", 1954, "Fantasy"),
        Book::new("Animal Farm", "George Orwell", 1945, "Political Satire"),
        Book::new("The Alchemist", "Paulo Coelho", 1988, "Fiction"),
        Book::new("Moby Dick", "Herman Melville", 1851, "Adventure"),
        Book::new("Wuthering Heights", "Emily Brontë", 1847, "Gothic Fiction"),
    ]
}
