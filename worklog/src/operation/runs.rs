use crate::error::WorklogError;
use crate::types::SynchronizationRun;
use crate::ApplicationRuntime;

/// The user's runs, most recent first, and the days since the last export
pub(crate) fn execute(
    runtime: &ApplicationRuntime,
) -> Result<(Vec<SynchronizationRun>, Option<i64>), WorklogError> {
    let user = runtime.user();
    let runs = runtime.synchronizer().runs(user)?;
    let days = runtime.worklog_service().days_since_last_sync(user)?;
    Ok((runs, days))
}
