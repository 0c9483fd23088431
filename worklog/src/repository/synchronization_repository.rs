use crate::error::WorklogError;
use crate::types::{NewSynchronization, SynchronizationRun};

pub trait SynchronizationRepository: Send + Sync {
    /// Stores a new, active run
    ///
    /// # Errors
    /// Database failures
    fn create(&self, run: &NewSynchronization) -> Result<SynchronizationRun, WorklogError>;

    /// # Errors
    /// Database failures
    fn find_by_id(&self, id: i64) -> Result<Option<SynchronizationRun>, WorklogError>;

    /// Most recent first
    ///
    /// # Errors
    /// Database failures
    fn find_for_user(&self, user_id: i64) -> Result<Vec<SynchronizationRun>, WorklogError>;

    /// Flags an active run as completed.
    ///
    /// # Returns
    /// `false` if the run was no longer active
    ///
    /// # Errors
    /// Database failures
    fn mark_completed(&self, id: i64) -> Result<bool, WorklogError>;

    /// Flags an active run as cancelled and drops its worklogs in one transaction.
    ///
    /// # Returns
    /// The number of worklogs removed, `None` if the run was no longer active
    ///
    /// # Errors
    /// Database failures, in which case nothing changes
    fn cancel(&self, id: i64) -> Result<Option<usize>, WorklogError>;

    /// Removes the run together with its worklogs
    ///
    /// # Errors
    /// Database failures
    fn delete(&self, id: i64) -> Result<(), WorklogError>;
}
