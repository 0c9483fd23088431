use log::debug;

use crate::error::WorklogError;
use crate::types::{RunSummary, SynchronizationRun};
use crate::{date, ApplicationRuntime};

pub struct Sync {
    /// Connection ids
    pub source: Option<i64>,
    pub target: Option<i64>,
    /// Start of the window, e.g. `2024-03-01` or `2024-03-01T08:00`, in the user's timezone
    pub from: String,
}

/// Creates a run, imports the source's entries and checks their issue
/// references against the target.
///
/// # Returns
/// The summary of the new run, and the runs which were still unfinished
/// before it was started
///
/// # Errors
/// Invalid input, unknown connections and failures of either provider
pub(crate) async fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Sync,
) -> Result<(RunSummary, Vec<SynchronizationRun>), WorklogError> {
    let from = date::str_to_naive_date_time(&instructions.from)?;
    let user = runtime.user();
    let unfinished = runtime.synchronizer().unfinished_runs(user)?;
    debug!("{} unfinished synchronization(s) before starting a new one", unfinished.len());

    let summary = runtime
        .synchronizer()
        .start(user, instructions.source, instructions.target, from)
        .await?;
    Ok((summary, unfinished))
}
