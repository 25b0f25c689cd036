//! Repository layer abstractions and backend implementations.
//!
//! # Responsibility
//! - Define one data-access contract covering every bookstore query.
//! - Keep SQL and BSON details out of the service and runner layers.
//!
//! # Invariants
//! - Point update/delete touch at most one record and report no count.
//! - Lookups that match nothing return `None`/empty, never an error.

pub mod book_repo;
pub mod mongo_book_repo;
