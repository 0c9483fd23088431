use crate::error::WorklogError;
use crate::repository::synchronization_repository::SynchronizationRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{NewSynchronization, SynchronizationRun};
use log::debug;
use rusqlite::{params, OptionalExtension, Row};

pub struct SqliteSynchronizationRepository {
    connection: SharedSqliteConnection,
}

/// SQL statement to create the `synchronization` table.
const CREATE_SYNCHRONIZATION_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS synchronization (
        id integer primary key autoincrement not null,
        user_id integer not null,
        source_id integer not null,
        target_id integer not null,
        date_started_from datetime not null,
        date_created datetime not null,
        is_completed boolean not null default 0,
        is_cancelled boolean not null default 0,
        CHECK (source_id <> target_id),
        CHECK (NOT (is_completed AND is_cancelled))
    );
";

const SELECT_RUN: &str = "SELECT id, user_id, source_id, target_id, date_started_from, date_created, is_completed, is_cancelled FROM synchronization";

/// Creates the `synchronization` table in the database.
pub(crate) fn create_synchronization_table(
    connection: &SharedSqliteConnection,
) -> Result<(), WorklogError> {
    let conn = connection.lock().map_err(|_| WorklogError::LockPoisoned)?;
    conn.execute(CREATE_SYNCHRONIZATION_TABLE_SQL, [])?;
    Ok(())
}

fn set_flag_if_active_sql(column: &str) -> String {
    format!(
        "UPDATE synchronization SET {column} = 1 WHERE id = ?1 AND is_completed = 0 AND is_cancelled = 0"
    )
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<SynchronizationRun> {
    Ok(SynchronizationRun {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source_id: row.get(2)?,
        target_id: row.get(3)?,
        date_started_from: row.get(4)?,
        date_created: row.get(5)?,
        is_completed: row.get(6)?,
        is_cancelled: row.get(7)?,
    })
}

impl SqliteSynchronizationRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }

    fn set_flag_if_active(&self, id: i64, column: &str) -> Result<bool, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let changed = conn.execute(&set_flag_if_active_sql(column), params![id])?;
        debug!("Set {column} on synchronization {id}: {changed} row(s) changed");
        Ok(changed == 1)
    }
}

impl SynchronizationRepository for SqliteSynchronizationRepository {
    fn create(&self, run: &NewSynchronization) -> Result<SynchronizationRun, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO synchronization (user_id, source_id, target_id, date_started_from, date_created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run.user_id,
                run.source_id,
                run.target_id,
                run.date_started_from,
                run.date_created
            ],
        )
        .map_err(|e| WorklogError::Sql(format!("Unable to insert into synchronization: {e}")))?;

        Ok(SynchronizationRun {
            id: conn.last_insert_rowid(),
            user_id: run.user_id,
            source_id: run.source_id,
            target_id: run.target_id,
            date_started_from: run.date_started_from,
            date_created: run.date_created,
            is_completed: false,
            is_cancelled: false,
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<SynchronizationRun>, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let run = conn
            .query_row(&format!("{SELECT_RUN} WHERE id = ?1"), params![id], run_from_row)
            .optional()?;
        Ok(run)
    }

    fn find_for_user(&self, user_id: i64) -> Result<Vec<SynchronizationRun>, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_RUN} WHERE user_id = ?1 ORDER BY date_created DESC, id DESC"
        ))?;
        let runs = stmt
            .query_map(params![user_id], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    fn mark_completed(&self, id: i64) -> Result<bool, WorklogError> {
        self.set_flag_if_active(id, "is_completed")
    }

    fn cancel(&self, id: i64) -> Result<Option<usize>, WorklogError> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let changed = tx.execute(&set_flag_if_active_sql("is_cancelled"), params![id])?;
        if changed == 0 {
            debug!("Synchronization {id} is no longer active, not cancelled");
            return Ok(None);
        }
        let deleted = tx.execute(
            "DELETE FROM worklog WHERE synchronization_id = ?1",
            params![id],
        )?;
        tx.commit()?;
        Ok(Some(deleted))
    }

    fn delete(&self, id: i64) -> Result<(), WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        conn.execute("DELETE FROM synchronization WHERE id = ?1", params![id])?;
        Ok(())
    }
}
