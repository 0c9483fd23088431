use crate::error::WorklogError;
use crate::repository::worklog_repository::WorklogRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{NewWorklog, WorklogGroup, WorklogRecord};
use log::debug;
use rusqlite::{params, OptionalExtension, Row, Transaction};

pub struct SqliteWorklogRepository {
    connection: SharedSqliteConnection,
}

/// SQL statement to create the `worklog` table.
const CREATE_WORKLOG_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS worklog (
        id integer primary key autoincrement not null,
        user_id integer not null,
        synchronization_id integer not null,
        date_started datetime not null,
        date_stopped datetime not null,
        date_created datetime,
        date_synchronized datetime not null,
        duration integer not null,
        comment varchar(1024) not null,
        issue_id varchar(255),
        source_id varchar(255),
        is_valid boolean not null,
        is_issue_confirmed boolean,
        parent_id integer,
        FOREIGN KEY (synchronization_id) REFERENCES synchronization(id) ON DELETE CASCADE,
        FOREIGN KEY (parent_id) REFERENCES worklog(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS worklog_user_source_idx ON worklog(user_id, source_id);
    CREATE INDEX IF NOT EXISTS worklog_synchronization_idx ON worklog(synchronization_id);
";

const SELECT_WORKLOG: &str = "SELECT id, user_id, synchronization_id, date_started, date_stopped, date_created, date_synchronized, duration, comment, issue_id, source_id, is_valid, is_issue_confirmed, parent_id FROM worklog";

/// Creates the `worklog` table in the database.
pub(crate) fn create_worklog_table(connection: &SharedSqliteConnection) -> Result<(), WorklogError> {
    let conn = connection.lock().map_err(|_| WorklogError::LockPoisoned)?;
    conn.execute_batch(CREATE_WORKLOG_TABLE_SQL)?;
    Ok(())
}

fn worklog_from_row(row: &Row<'_>) -> rusqlite::Result<WorklogRecord> {
    Ok(WorklogRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        synchronization_id: row.get(2)?,
        date_started: row.get(3)?,
        date_stopped: row.get(4)?,
        date_created: row.get(5)?,
        date_synchronized: row.get(6)?,
        duration: row.get(7)?,
        comment: row.get(8)?,
        issue_id: row.get(9)?,
        source_id: row.get(10)?,
        is_valid: row.get(11)?,
        is_issue_confirmed: row.get(12)?,
        parent_id: row.get(13)?,
    })
}

fn insert_worklog(
    tx: &Transaction<'_>,
    worklog: &NewWorklog,
    parent_id: Option<i64>,
) -> rusqlite::Result<i64> {
    tx.execute(
        "INSERT INTO worklog (
            user_id, synchronization_id, date_started, date_stopped, date_created,
            date_synchronized, duration, comment, issue_id, source_id, is_valid, parent_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            worklog.user_id,
            worklog.synchronization_id,
            worklog.date_started,
            worklog.date_stopped,
            worklog.date_created,
            worklog.date_synchronized,
            worklog.duration,
            worklog.comment,
            worklog.issue_id,
            worklog.source_id,
            worklog.is_valid,
            parent_id,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Instants may carry different offsets, so ordering happens here rather than in SQL
fn sort_by_start(mut worklogs: Vec<WorklogRecord>) -> Vec<WorklogRecord> {
    worklogs.sort_by(|a, b| {
        a.date_started
            .cmp(&b.date_started)
            .then_with(|| a.id.cmp(&b.id))
    });
    worklogs
}

impl SqliteWorklogRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }

    fn query(&self, filter: &str, id: i64) -> Result<Vec<WorklogRecord>, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let mut stmt = conn.prepare(&format!("{SELECT_WORKLOG} WHERE {filter}"))?;
        let worklogs = stmt
            .query_map(params![id], worklog_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sort_by_start(worklogs))
    }
}

impl WorklogRepository for SqliteWorklogRepository {
    fn insert_groups(&self, groups: &[WorklogGroup]) -> Result<usize, WorklogError> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let mut written = 0;
        for group in groups {
            let parent_id = match &group.aggregate {
                Some(aggregate) => {
                    written += 1;
                    Some(insert_worklog(&tx, aggregate, None)?)
                }
                None => None,
            };
            for member in &group.members {
                insert_worklog(&tx, member, parent_id)?;
                written += 1;
            }
        }
        tx.commit()
            .map_err(|e| WorklogError::Sql(format!("Unable to insert into worklog: {e}")))?;
        debug!("Inserted {written} worklog row(s) in {} group(s)", groups.len());
        Ok(written)
    }

    fn exists_valid_by_source_id(
        &self,
        user_id: i64,
        source_id: &str,
    ) -> Result<bool, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM worklog WHERE user_id = ?1 AND source_id = ?2 AND is_valid = 1)",
            params![user_id, source_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<WorklogRecord>, WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let worklog = conn
            .query_row(
                &format!("{SELECT_WORKLOG} WHERE id = ?1"),
                params![id],
                worklog_from_row,
            )
            .optional()?;
        Ok(worklog)
    }

    fn find_top_level_for_run(&self, run_id: i64) -> Result<Vec<WorklogRecord>, WorklogError> {
        self.query("synchronization_id = ?1 AND parent_id IS NULL", run_id)
    }

    fn find_top_level_valid_for_run(
        &self,
        run_id: i64,
    ) -> Result<Vec<WorklogRecord>, WorklogError> {
        self.query(
            "synchronization_id = ?1 AND parent_id IS NULL AND is_valid = 1",
            run_id,
        )
    }

    fn find_children(&self, parent_id: i64) -> Result<Vec<WorklogRecord>, WorklogError> {
        self.query("parent_id = ?1", parent_id)
    }

    fn apply_validation(&self, outcomes: &[(i64, bool)]) -> Result<(), WorklogError> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let tx = conn.transaction()?;
        for (id, confirmed) in outcomes {
            if *confirmed {
                tx.execute(
                    "UPDATE worklog SET is_issue_confirmed = 1 WHERE id = ?1",
                    params![id],
                )?;
            } else {
                tx.execute(
                    "UPDATE worklog SET is_issue_confirmed = 0, is_valid = 0 WHERE id = ?1",
                    params![id],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn mark_invalid(&self, ids: &[i64]) -> Result<(), WorklogError> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("UPDATE worklog SET is_valid = 0 WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update(&self, worklog: &WorklogRecord) -> Result<(), WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let changed = conn.execute(
            "UPDATE worklog SET comment = ?1, issue_id = ?2, is_valid = ?3, is_issue_confirmed = ?4 WHERE id = ?5",
            params![
                worklog.comment,
                worklog.issue_id,
                worklog.is_valid,
                worklog.is_issue_confirmed,
                worklog.id
            ],
        )?;
        if changed == 0 {
            return Err(WorklogError::NotFound(format!("worklog {}", worklog.id)));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), WorklogError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        conn.execute("DELETE FROM worklog WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn delete_many(&self, ids: &[i64]) -> Result<usize, WorklogError> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| WorklogError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute("DELETE FROM worklog WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}
