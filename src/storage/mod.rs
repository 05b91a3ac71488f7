//! Storage Layer - SQLite sessions and generated DDL
//!
//! A `StoreConnection` is opened from a location string, handed to importers
//! by `&mut` reference and closed exactly once by its owner.

pub mod schema;
pub mod sqlite;

pub use sqlite::{StoreConnection, StoreLocation, TableStats, with_connection};
