//! Connection bootstrap for the MongoDB backend.
//!
//! # Responsibility
//! - Build a blocking driver client from the configured URI.
//! - Verify reachability with `ping` before the connection is handed out.
//! - Release the client exactly once.

use super::DbResult;
use crate::config::BookstoreConfig;
use log::{error, info};
use mongodb::bson::doc;
use mongodb::sync::{Client, Database};
use std::time::Instant;

/// Open MongoDB client bound to one database and collection.
pub struct MongoConnection {
    client: Client,
    database: String,
    collection: String,
}

impl MongoConnection {
    /// Returns a handle to the configured database.
    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    /// Collection the bookstore records live in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Shuts the client down and waits for its pool and background workers.
    ///
    /// Handles derived from this connection must be dropped first.
    ///
    /// # Side effects
    /// - Emits a `db_close` logging event.
    pub fn close(self) {
        let started_at = Instant::now();
        self.client.shutdown().run();
        info!(
            "event=db_close module=db status=ok backend=mongo database={} duration_ms={}",
            self.database,
            started_at.elapsed().as_millis()
        );
    }
}

/// Connects to MongoDB and verifies the server answers `ping`.
///
/// # Side effects
/// - Opens the driver connection pool.
/// - Emits `db_open` logging events with duration and status.
///
/// # Errors
/// - Returns `DbError::Mongo` for an invalid URI or an unreachable server.
pub fn connect_mongo(config: &BookstoreConfig) -> DbResult<MongoConnection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start backend=mongo database={}",
        config.database
    );

    let client = match Client::with_uri_str(&config.mongodb_uri) {
        Ok(client) => client,
        Err(err) => {
            error!(
                "event=db_open module=db status=error backend=mongo duration_ms={} error_code=db_client_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = client.database("admin").run_command(doc! { "ping": 1 }).run() {
        error!(
            "event=db_open module=db status=error backend=mongo duration_ms={} error_code=db_ping_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err.into());
    }

    info!(
        "event=db_open module=db status=ok backend=mongo database={} duration_ms={}",
        config.database,
        started_at.elapsed().as_millis()
    );
    Ok(MongoConnection {
        client,
        database: config.database.clone(),
        collection: config.collection.clone(),
    })
}
