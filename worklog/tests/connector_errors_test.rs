#[cfg(test)]
#[allow(dead_code)]
mod test_helpers;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use connectors::{
    Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion, RawEntry,
};
use mockall::mock;
use mockall::predicate::eq;
use worklog::error::WorklogError;
use worklog::operation::issues::Issues;
use worklog::operation::sync::Sync as SyncInstructions;
use worklog::{Operation, OperationResult};

use crate::test_helpers::common::{create_test_runtime, GITLAB, JIRA, TOGGL};
use crate::test_helpers::fake_connector::{FakeConnector, FakeConnectorFactory};
use crate::test_helpers::fixtures::{at, entry};

mock! {
    pub Provider {}

    #[async_trait]
    impl Connector for Provider {
        async fn import_worklogs(
            &self,
            start: DateTime<FixedOffset>,
            end: DateTime<FixedOffset>,
        ) -> Result<Vec<RawEntry>, ConnectorError>;
        async fn export_worklogs(&self, worklogs: &[ExportWorklog]) -> Result<ExportOutcome, ConnectorError>;
        async fn validate_issue(&self, issue_id: &str) -> Result<bool, ConnectorError>;
        async fn search_issues(&self, term: &str) -> Result<Vec<IssueSuggestion>, ConnectorError>;
    }
}

fn sync_instructions(source: i64, target: i64) -> SyncInstructions {
    SyncInstructions {
        source: Some(source),
        target: Some(target),
        from: "2024-03-01".to_string(),
    }
}

#[tokio::test]
async fn test_validation_error_discards_run() {
    let mut target = MockProvider::new();
    target
        .expect_validate_issue()
        .with(eq("ABC-1"))
        .times(1)
        .returning(|_| Err(ConnectorError::Unauthorized));

    let factory = FakeConnectorFactory::default()
        .with(
            TOGGL,
            Arc::new(FakeConnector::source(vec![entry(
                "a",
                at(4, 9, 0),
                600,
                "[ABC-1] review",
            )])),
        )
        .with(JIRA, Arc::new(target));
    let runtime = create_test_runtime(Arc::new(factory)).unwrap();

    let result = runtime
        .execute(Operation::Sync(sync_instructions(TOGGL, JIRA)))
        .await;
    assert!(matches!(
        result,
        Err(WorklogError::Connector(ConnectorError::Unauthorized))
    ));
    assert!(runtime.synchronizer().runs(runtime.user()).unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_import_is_reported() {
    // Jira has no read API
    let mut source = MockProvider::new();
    source.expect_import_worklogs().returning(|_, _| {
        Err(ConnectorError::Unsupported {
            provider: "Jira",
            operation: "import",
        })
    });

    let factory = FakeConnectorFactory::default()
        .with(JIRA, Arc::new(source))
        .with(GITLAB, Arc::new(FakeConnector::target(&[])));
    let runtime = create_test_runtime(Arc::new(factory)).unwrap();

    let result = runtime
        .execute(Operation::Sync(sync_instructions(JIRA, GITLAB)))
        .await;
    assert!(matches!(
        result,
        Err(WorklogError::Unsupported { provider: "Jira", .. })
    ));
}

#[tokio::test]
async fn test_search_error_falls_back_to_term() -> Result<(), WorklogError> {
    let mut target = MockProvider::new();
    target
        .expect_search_issues()
        .returning(|_| Err(ConnectorError::MalformedResponse("<html>".to_string())));

    let factory = FakeConnectorFactory::default()
        .with(TOGGL, Arc::new(FakeConnector::source(vec![])))
        .with(JIRA, Arc::new(target));
    let runtime = create_test_runtime(Arc::new(factory))?;

    let OperationResult::Synchronised { summary, unfinished } = runtime
        .execute(Operation::Sync(sync_instructions(TOGGL, JIRA)))
        .await?
    else {
        panic!("expected a synchronization summary");
    };
    assert!(unfinished.is_empty());

    let OperationResult::IssueSuggestions(suggestions) = runtime
        .execute(Operation::Issues(Issues {
            run_id: summary.run.id,
            term: "ABC-1".to_string(),
        }))
        .await?
    else {
        panic!("expected issue suggestions");
    };
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, "ABC-1");

    // The first run is still waiting to be exported
    let OperationResult::Synchronised { unfinished, .. } = runtime
        .execute(Operation::Sync(sync_instructions(TOGGL, JIRA)))
        .await?
    else {
        panic!("expected a synchronization summary");
    };
    assert_eq!(unfinished.len(), 1);
    assert_eq!(unfinished[0].id, summary.run.id);
    Ok(())
}

#[tokio::test]
async fn test_window_start_must_parse() {
    let runtime = create_test_runtime(Arc::new(FakeConnectorFactory::default())).unwrap();
    let mut instructions = sync_instructions(TOGGL, JIRA);
    instructions.from = "last tuesday".to_string();

    let result = runtime.execute(Operation::Sync(instructions)).await;
    assert!(matches!(result, Err(WorklogError::BadInput(_))));
    assert!(runtime.synchronizer().runs(runtime.user()).unwrap().is_empty());
}
