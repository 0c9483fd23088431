use crate::error::WorklogError;
use crate::repository::user_repository::UserRepository;
use crate::repository::SharedSqliteConnection;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

pub struct SqliteUserRepository {
    connection: SharedSqliteConnection,
}

impl SqliteUserRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

/// SQL statement to create the `user_sync` table.
const CREATE_USER_SYNC_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS user_sync (
    user_id integer primary key NOT NULL,
    last_sync datetime NOT NULL
);
";

/// Creates the `user_sync` table in the database.
pub(crate) fn create_schema(connection: &SharedSqliteConnection) -> Result<(), WorklogError> {
    let conn = connection.lock().map_err(|_| WorklogError::LockPoisoned)?;
    conn.execute(CREATE_USER_SYNC_TABLE_SQL, [])?;
    Ok(())
}

impl UserRepository for SqliteUserRepository {
    fn last_sync(&self, user_id: i64) -> Result<Option<DateTime<Utc>>, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let last_sync = conn
            .query_row(
                "SELECT last_sync FROM user_sync WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last_sync)
    }

    fn set_last_sync(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO user_sync (user_id, last_sync) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_sync = excluded.last_sync",
            params![user_id, at],
        )
        .map_err(|e| WorklogError::Sql(format!("Unable to stamp last sync of user {user_id}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::test_database_manager;
    use chrono::TimeZone;

    #[test]
    fn test_last_sync_is_overwritten() -> Result<(), WorklogError> {
        let db_manager = test_database_manager()?;
        let user_repo = db_manager.create_user_repository();

        assert_eq!(user_repo.last_sync(1)?, None);

        let first = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 8, 9, 30, 0).unwrap();
        user_repo.set_last_sync(1, first)?;
        user_repo.set_last_sync(1, second)?;

        assert_eq!(user_repo.last_sync(1)?, Some(second));
        assert_eq!(user_repo.last_sync(2)?, None);
        Ok(())
    }
}
