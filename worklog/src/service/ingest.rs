//! Turns the raw entries of a source provider into persisted worklogs.
//!
//! Entries are ordered by start, their issue references are extracted, and
//! entries sharing day, issue and comment are grouped. Entries already
//! imported (by `source_id`) are dropped. A group with several survivors is
//! stored as an aggregate parent with the survivors as its children.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use connectors::RawEntry;
use log::{debug, info};

use crate::date::Clock;
use crate::error::WorklogError;
use crate::parser::IssueReferenceParser;
use crate::repository::worklog_repository::WorklogRepository;
use crate::types::{NewWorklog, UserContext, WorklogGroup};

type GroupKey = (NaiveDate, Option<String>, String);

pub struct WorklogIngestionEngine {
    repo: Arc<dyn WorklogRepository>,
    clock: Arc<dyn Clock>,
}

impl WorklogIngestionEngine {
    pub fn new(repo: Arc<dyn WorklogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Stores `entries` as worklogs of run `run_id`, in one transaction.
    ///
    /// # Returns
    /// The number of rows written, aggregates included
    ///
    /// # Errors
    /// If the user's issue id pattern is unusable or storage fails
    pub fn ingest(
        &self,
        user: &UserContext,
        run_id: i64,
        entries: Vec<RawEntry>,
        target_provider: &str,
    ) -> Result<usize, WorklogError> {
        let groups = self.plan(user, run_id, entries, target_provider)?;
        if groups.is_empty() {
            info!("Nothing new to store for synchronization {run_id}");
            return Ok(0);
        }
        self.repo.insert_groups(&groups)
    }

    /// Works out what [`Self::ingest`] would write, without writing it
    ///
    /// # Errors
    /// If the user's issue id pattern is unusable or the duplicate lookup fails
    pub fn plan(
        &self,
        user: &UserContext,
        run_id: i64,
        mut entries: Vec<RawEntry>,
        target_provider: &str,
    ) -> Result<Vec<WorklogGroup>, WorklogError> {
        let parser =
            IssueReferenceParser::new(&user.issue_id_pattern, user.default_target.clone())?;
        let now = self.clock.now();

        entries.sort_by_key(|e| e.date_started);

        let mut order: Vec<GroupKey> = Vec::new();
        let mut grouped: HashMap<GroupKey, Vec<NewWorklog>> = HashMap::new();
        for entry in entries {
            let (issue_id, comment) = parser.parse(&entry.comment, target_provider);
            let worklog = NewWorklog {
                user_id: user.id,
                synchronization_id: run_id,
                date_started: entry.date_started,
                date_stopped: entry.date_stopped,
                date_created: entry.date_created,
                date_synchronized: now,
                duration: entry.duration,
                is_valid: issue_id.is_some(),
                comment,
                issue_id,
                source_id: Some(entry.source_id),
            };
            let key = (
                worklog.date_started.date_naive(),
                worklog.issue_id.clone(),
                worklog.comment.clone(),
            );
            grouped
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(worklog);
        }

        let mut planned: HashSet<String> = HashSet::new();
        let mut groups = Vec::new();
        for key in order {
            let Some(members) = grouped.remove(&key) else {
                continue;
            };

            let mut survivors = Vec::with_capacity(members.len());
            for worklog in members {
                if self.is_duplicate(user.id, &worklog, &planned)? {
                    debug!("Skipping {:?}, already imported", worklog.source_id);
                    continue;
                }
                if let (true, Some(source_id)) = (worklog.is_valid, &worklog.source_id) {
                    planned.insert(source_id.clone());
                }
                survivors.push(worklog);
            }

            match survivors.len() {
                0 => {}
                1 => groups.push(WorklogGroup {
                    aggregate: None,
                    members: survivors,
                }),
                _ => groups.push(WorklogGroup {
                    aggregate: Some(aggregate_of(&survivors)),
                    members: survivors,
                }),
            }
        }
        Ok(groups)
    }

    fn is_duplicate(
        &self,
        user_id: i64,
        worklog: &NewWorklog,
        planned: &HashSet<String>,
    ) -> Result<bool, WorklogError> {
        let Some(source_id) = worklog.source_id.as_deref() else {
            return Ok(false);
        };
        if planned.contains(source_id) {
            return Ok(true);
        }
        self.repo.exists_valid_by_source_id(user_id, source_id)
    }
}

/// `members` must be non-empty and ordered by start
fn aggregate_of(members: &[NewWorklog]) -> NewWorklog {
    let first = &members[0];
    NewWorklog {
        user_id: first.user_id,
        synchronization_id: first.synchronization_id,
        date_started: first.date_started,
        date_stopped: members
            .iter()
            .map(|m| m.date_stopped)
            .max()
            .unwrap_or(first.date_stopped),
        date_created: None,
        date_synchronized: first.date_synchronized,
        duration: members.iter().map(|m| m.duration).sum(),
        comment: first.comment.clone(),
        issue_id: first.issue_id.clone(),
        source_id: None,
        is_valid: first.is_valid,
    }
}
