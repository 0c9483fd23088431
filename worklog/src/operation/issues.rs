use connectors::IssueSuggestion;

use crate::{error::WorklogError, ApplicationRuntime};

pub struct Issues {
    pub run_id: i64,
    pub term: String,
}

pub(crate) async fn execute(
    runtime: &ApplicationRuntime,
    instructions: &Issues,
) -> Result<Vec<IssueSuggestion>, WorklogError> {
    runtime
        .synchronizer()
        .search_issues(runtime.user(), instructions.run_id, &instructions.term)
        .await
}
