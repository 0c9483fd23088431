use crate::error::WorklogError;
use crate::types::WorklogRecord;
use crate::ApplicationRuntime;

pub struct Edit {
    pub worklog_id: i64,
    pub comment: Option<String>,
    /// An empty string removes the issue reference
    pub issue_id: Option<String>,
}

pub(crate) fn execute(
    runtime: &ApplicationRuntime,
    instructions: Edit,
) -> Result<WorklogRecord, WorklogError> {
    if instructions.comment.is_none() && instructions.issue_id.is_none() {
        return Err(WorklogError::BadInput(
            "nothing to change, supply a comment and/or an issue".to_string(),
        ));
    }
    runtime.worklog_service().edit_worklog(
        runtime.user(),
        instructions.worklog_id,
        instructions.comment,
        instructions.issue_id,
    )
}
