//! Persistent storage for vector collections

mod database;

pub use database::SqliteCollection;
