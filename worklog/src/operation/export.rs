use crate::error::WorklogError;
use crate::service::synchronization::ExportReport;
use crate::ApplicationRuntime;

pub struct Export {
    pub run_id: i64,
}

pub(crate) async fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Export,
) -> Result<ExportReport, WorklogError> {
    runtime
        .synchronizer()
        .export_phase(runtime.user(), instructions.run_id)
        .await
}
