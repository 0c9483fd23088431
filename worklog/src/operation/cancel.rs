use crate::error::WorklogError;
use crate::ApplicationRuntime;

pub struct Cancel {
    pub run_id: i64,
}

pub(crate) async fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Cancel,
) -> Result<i64, WorklogError> {
    runtime
        .synchronizer()
        .cancel(runtime.user(), instructions.run_id)
        .await?;
    Ok(instructions.run_id)
}
