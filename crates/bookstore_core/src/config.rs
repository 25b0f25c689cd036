//! Connection settings for the bookstore backends.

/// Default MongoDB connection string.
pub const DEFAULT_MONGODB_URI: &str = "mongodb://127.0.0.1:27017";
/// Default database name.
pub const DEFAULT_DATABASE: &str = "plp_bookstore";
/// Default collection (and SQLite table) name.
pub const DEFAULT_COLLECTION: &str = "books";

/// Where and what the demo connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookstoreConfig {
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
}

impl Default for BookstoreConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}
