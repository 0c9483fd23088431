use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// Storage contracts used by the services
pub mod synchronization_repository;
pub mod user_repository;
pub mod worklog_repository;

// Database-related utilities and managers.
pub mod database_manager;
pub(crate) mod sqlite;

/// A thread-safe, shared connection to an ``SQLite`` database,
/// used across multiple repository layers.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Connection>>;
