//! Storage of imported worklogs and the aggregates synthesized from them.
use crate::error::WorklogError;
use crate::types::{WorklogGroup, WorklogRecord};

#[cfg_attr(test, mockall::automock)]
pub trait WorklogRepository: Send + Sync {
    /// Inserts every group in a single transaction. The aggregate of a group,
    /// if any, is written first and becomes the parent of the members.
    ///
    /// # Returns
    /// The number of rows written, aggregates included
    ///
    /// # Errors
    /// Nothing is written if any insert fails
    fn insert_groups(&self, groups: &[WorklogGroup]) -> Result<usize, WorklogError>;

    /// Is there a valid worklog of this user carrying the given `source_id`?
    ///
    /// # Errors
    /// Database failures
    fn exists_valid_by_source_id(&self, user_id: i64, source_id: &str)
        -> Result<bool, WorklogError>;

    /// # Errors
    /// Database failures
    fn find_by_id(&self, id: i64) -> Result<Option<WorklogRecord>, WorklogError>;

    /// Worklogs without a parent, ordered by `date_started` and then id
    ///
    /// # Errors
    /// Database failures
    fn find_top_level_for_run(&self, run_id: i64) -> Result<Vec<WorklogRecord>, WorklogError>;

    /// The subset of [`Self::find_top_level_for_run`] marked valid
    ///
    /// # Errors
    /// Database failures
    fn find_top_level_valid_for_run(
        &self,
        run_id: i64,
    ) -> Result<Vec<WorklogRecord>, WorklogError>;

    /// # Errors
    /// Database failures
    fn find_children(&self, parent_id: i64) -> Result<Vec<WorklogRecord>, WorklogError>;

    /// Records the outcome of checking issue references, all in one transaction.
    /// An unconfirmed reference also invalidates the worklog.
    ///
    /// # Errors
    /// Nothing is updated if any update fails
    fn apply_validation(&self, outcomes: &[(i64, bool)]) -> Result<(), WorklogError>;

    /// # Errors
    /// Database failures
    fn mark_invalid(&self, ids: &[i64]) -> Result<(), WorklogError>;

    /// Writes back `comment`, `issue_id`, `is_valid` and `is_issue_confirmed`
    ///
    /// # Errors
    /// `NotFound` if the worklog does not exist
    fn update(&self, worklog: &WorklogRecord) -> Result<(), WorklogError>;

    /// Children are removed along with their parent
    ///
    /// # Errors
    /// Database failures
    fn delete(&self, id: i64) -> Result<(), WorklogError>;

    /// # Errors
    /// Nothing is deleted if any delete fails
    fn delete_many(&self, ids: &[i64]) -> Result<usize, WorklogError>;
}
