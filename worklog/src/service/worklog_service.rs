//! Manual corrections to imported worklogs before they are exported.
use crate::date::{self, Clock};
use crate::error::WorklogError;
use crate::repository::synchronization_repository::SynchronizationRepository;
use crate::repository::user_repository::UserRepository;
use crate::repository::worklog_repository::WorklogRepository;
use crate::types::{UserContext, WorklogRecord};
use log::debug;
use std::sync::Arc;

pub struct WorkLogService {
    worklogs: Arc<dyn WorklogRepository>,
    runs: Arc<dyn SynchronizationRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl WorkLogService {
    pub fn new(
        worklogs: Arc<dyn WorklogRepository>,
        runs: Arc<dyn SynchronizationRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            worklogs,
            runs,
            users,
            clock,
        }
    }

    /// Corrects the comment and/or issue reference of a top level worklog in
    /// an active run. `None` leaves a field as it is, an empty issue id
    /// removes the reference. The issue has to be confirmed again afterwards.
    ///
    /// # Errors
    /// `NotFound` for worklogs of other users, `BadInput` for members of an
    /// aggregate, `InactiveRun` once the run has ended
    pub fn edit_worklog(
        &self,
        user: &UserContext,
        id: i64,
        comment: Option<String>,
        issue_id: Option<String>,
    ) -> Result<WorklogRecord, WorklogError> {
        let mut worklog = self.owned_worklog(user, id)?;
        if !worklog.is_top_level() {
            return Err(WorklogError::BadInput(format!(
                "worklog {id} is part of aggregate {:?} and cannot be edited on its own",
                worklog.parent_id
            )));
        }
        let run = self
            .runs
            .find_by_id(worklog.synchronization_id)?
            .ok_or_else(|| WorklogError::NotFound(format!("synchronization {}", worklog.synchronization_id)))?;
        if !run.is_active() {
            return Err(WorklogError::InactiveRun(run.id));
        }

        if let Some(comment) = comment {
            worklog.comment = comment.trim().to_string();
        }
        if let Some(issue_id) = issue_id {
            let issue_id = issue_id.trim();
            worklog.issue_id = (!issue_id.is_empty()).then(|| issue_id.to_string());
        }
        worklog.is_valid = !worklog.comment.is_empty() && worklog.issue_id.is_some();
        worklog.is_issue_confirmed = None;

        debug!("Updating worklog {id}: {worklog:?}");
        self.worklogs.update(&worklog)?;
        Ok(worklog)
    }

    /// Removes a worklog, and its members if it is an aggregate
    ///
    /// # Errors
    /// `NotFound` for worklogs of other users
    pub fn delete_worklog(&self, user: &UserContext, id: i64) -> Result<(), WorklogError> {
        let worklog = self.owned_worklog(user, id)?;
        self.worklogs.delete(worklog.id)
    }

    /// The worklogs an aggregate was made of
    ///
    /// # Errors
    /// `NotFound` for worklogs of other users
    pub fn members(&self, user: &UserContext, id: i64) -> Result<Vec<WorklogRecord>, WorklogError> {
        let worklog = self.owned_worklog(user, id)?;
        self.worklogs.find_children(worklog.id)
    }

    /// Whole days since the user's last completed export, if there ever was one
    ///
    /// # Errors
    /// Storage failures
    pub fn days_since_last_sync(&self, user: &UserContext) -> Result<Option<i64>, WorklogError> {
        Ok(self
            .users
            .last_sync(user.id)?
            .map(|last| date::days_between(last, self.clock.now(), user.timezone)))
    }

    fn owned_worklog(&self, user: &UserContext, id: i64) -> Result<WorklogRecord, WorklogError> {
        self.worklogs
            .find_by_id(id)?
            .filter(|w| w.user_id == user.id)
            .ok_or_else(|| WorklogError::NotFound(format!("worklog {id}")))
    }
}
