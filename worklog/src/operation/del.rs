use crate::{error::WorklogError, ApplicationRuntime};

pub struct Del {
    pub worklog_id: i64,
}

pub(crate) fn execute(runtime: &ApplicationRuntime, instructions: &Del) -> Result<i64, WorklogError> {
    runtime
        .worklog_service()
        .delete_worklog(runtime.user(), instructions.worklog_id)?;
    Ok(instructions.worklog_id)
}
