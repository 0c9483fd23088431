use std::collections::BTreeMap;

use crate::error::WorklogError;
use crate::types::{RunSummary, WorklogRecord};
use crate::ApplicationRuntime;

pub struct Show {
    pub run_id: i64,
    /// Include the worklogs each aggregate was made of
    pub members: bool,
}

pub(crate) fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Show,
) -> Result<(RunSummary, BTreeMap<i64, Vec<WorklogRecord>>), WorklogError> {
    let user = runtime.user();
    let summary = runtime.synchronizer().summary(user, instructions.run_id)?;

    let mut members = BTreeMap::new();
    if instructions.members {
        for aggregate in summary.worklogs.iter().filter(|w| w.source_id.is_none()) {
            members.insert(
                aggregate.id,
                runtime.worklog_service().members(user, aggregate.id)?,
            );
        }
    }
    Ok((summary, members))
}
