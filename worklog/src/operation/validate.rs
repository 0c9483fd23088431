use crate::error::WorklogError;
use crate::service::synchronization::ValidationOutcome;
use crate::types::RunSummary;
use crate::ApplicationRuntime;

pub struct Validate {
    pub run_id: i64,
}

/// Checks the issue references of a run once more, i.e. after edits
pub(crate) async fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Validate,
) -> Result<(ValidationOutcome, RunSummary), WorklogError> {
    let user = runtime.user();
    let outcome = runtime
        .synchronizer()
        .validate_phase(user, instructions.run_id)
        .await?;
    let summary = runtime.synchronizer().summary(user, instructions.run_id)?;
    Ok((outcome, summary))
}
