use crate::error::WorklogError;
use crate::repository::sqlite;
use crate::repository::sqlite::sqlite_synchronization_repo::SqliteSynchronizationRepository;
use crate::repository::sqlite::sqlite_user_repo::SqliteUserRepository;
use crate::repository::sqlite::sqlite_worklog_repo::SqliteWorklogRepository;
use crate::repository::SharedSqliteConnection;
use log::debug;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Represents parameters for initializing the database connection
pub enum DatabaseConfig {
    /// SQLite database with a specific file path
    SqliteOnDisk { path: PathBuf },

    /// SQLite database that runs entirely in memory
    SqliteInMemory,
}

pub struct DatabaseManager {
    connection: SharedSqliteConnection,
}

impl DatabaseManager {
    /// Opens the database and makes sure the schema is in place
    ///
    /// # Errors
    /// If the database cannot be opened or the schema cannot be created
    pub fn new(config: &DatabaseConfig) -> Result<Self, WorklogError> {
        let connection = match config {
            DatabaseConfig::SqliteOnDisk { path } => {
                debug!("Opening worklog database {}", path.display());
                sqlite::create_connection(path)?
            }
            DatabaseConfig::SqliteInMemory => Connection::open_in_memory()?,
        };
        // Cascading deletes rely on this, and it is a per connection setting
        connection.pragma_update(None, "foreign_keys", "ON")?;

        let connection = Arc::new(Mutex::new(connection));
        sqlite::create_schema(&connection)?;

        Ok(Self { connection })
    }

    /// Provide access to the shared database connection.
    pub(crate) fn get_connection(&self) -> SharedSqliteConnection {
        self.connection.clone()
    }

    pub(crate) fn create_worklog_repository(&self) -> Arc<SqliteWorklogRepository> {
        Arc::new(SqliteWorklogRepository::new(self.get_connection()))
    }

    pub(crate) fn create_synchronization_repository(
        &self,
    ) -> Arc<SqliteSynchronizationRepository> {
        Arc::new(SqliteSynchronizationRepository::new(self.get_connection()))
    }

    pub(crate) fn create_user_repository(&self) -> Arc<SqliteUserRepository> {
        Arc::new(SqliteUserRepository::new(self.get_connection()))
    }
}
