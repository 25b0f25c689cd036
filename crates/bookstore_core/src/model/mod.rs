//! Domain model for the bookstore collection.
//!
//! # Responsibility
//! - Define the book record and the read models derived from it.
//! - Keep one storage-neutral shape shared by every backend.

pub mod book;
pub mod catalogue;
