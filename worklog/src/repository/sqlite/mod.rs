use crate::error::WorklogError;
use crate::repository::SharedSqliteConnection;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub(crate) mod sqlite_synchronization_repo;
pub(crate) mod sqlite_user_repo;
pub(crate) mod sqlite_worklog_repo;

/// Creates the entire database schema by running schema creation functions for all entities.
/// Runs referenced by worklogs must exist first.
#[allow(clippy::module_name_repetitions)]
pub(crate) fn create_schema(connection: &SharedSqliteConnection) -> Result<(), WorklogError> {
    sqlite_synchronization_repo::create_synchronization_table(connection)?;
    sqlite_worklog_repo::create_worklog_table(connection)?;
    sqlite_user_repo::create_schema(connection)?;
    Ok(())
}

pub(crate) fn create_connection(dbms_path: &Path) -> Result<rusqlite::Connection, WorklogError> {
    if let Some(parent) = dbms_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let connection = Connection::open(dbms_path)?;
    Ok(connection)
}

#[cfg(test)]
pub(crate) mod tests;
