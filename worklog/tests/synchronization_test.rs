#[cfg(test)]
#[allow(dead_code)]
mod test_helpers;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use worklog::error::WorklogError;
use worklog::ApplicationRuntime;

use crate::test_helpers::common::{create_test_runtime, JIRA, TOGGL};
use crate::test_helpers::fake_connector::{FakeConnector, FakeConnectorFactory};
use crate::test_helpers::fixtures::{at, entry};

struct SynchronizationTestContext {
    runtime: Arc<ApplicationRuntime>,
    target: Arc<FakeConnector>,
}

impl SynchronizationTestContext {
    fn new(source: FakeConnector, target: FakeConnector) -> Self {
        let target = Arc::new(target);
        let factory = FakeConnectorFactory::default()
            .with(TOGGL, Arc::new(source))
            .with(JIRA, target.clone());
        Self {
            runtime: create_test_runtime(Arc::new(factory)).expect("Failed to create test runtime"),
            target,
        }
    }

    async fn start(&self) -> Result<i64, WorklogError> {
        let summary = self
            .runtime
            .synchronizer()
            .start(self.runtime.user(), Some(TOGGL), Some(JIRA), from())
            .await?;
        Ok(summary.run.id)
    }
}

fn from() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_start_groups_and_validates() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![
            entry("b", at(4, 13, 0), 120, "[ABC-1] review"),
            entry("a", at(4, 9, 0), 60, "[ABC-1] review"),
            entry("c", at(5, 9, 0), 1800, "[Jira:XYZ-9] deploy"),
            entry("d", at(5, 10, 0), 900, "coffee"),
        ]),
        FakeConnector::target(&["ABC-1"]),
    );
    let user = ctx.runtime.user();

    let run_id = ctx.start().await?;
    let summary = ctx.runtime.synchronizer().summary(user, run_id)?;

    assert!(summary.run.is_active());
    assert_eq!(summary.worklogs.len(), 3);

    let aggregate = &summary.worklogs[0];
    assert_eq!(aggregate.duration, 180);
    assert_eq!(aggregate.source_id, None);
    assert_eq!(aggregate.date_created, None);
    assert_eq!(aggregate.date_started, at(4, 9, 0));
    assert_eq!(aggregate.date_stopped, at(4, 13, 2));
    assert_eq!(aggregate.comment, "review");
    assert_eq!(aggregate.is_issue_confirmed, Some(true));

    let members = ctx.runtime.worklog_service().members(user, aggregate.id)?;
    let sources: Vec<_> = members.iter().map(|m| m.source_id.as_deref()).collect();
    assert_eq!(sources, vec![Some("a"), Some("b")]);
    assert!(members.iter().all(|m| m.parent_id == Some(aggregate.id)));

    let unknown_issue = &summary.worklogs[1];
    assert_eq!(unknown_issue.issue_id.as_deref(), Some("XYZ-9"));
    assert_eq!(unknown_issue.is_issue_confirmed, Some(false));
    assert!(!unknown_issue.is_valid);

    let no_issue = &summary.worklogs[2];
    assert_eq!(no_issue.issue_id, None);
    assert_eq!(no_issue.is_issue_confirmed, None);
    assert!(!no_issue.is_valid);

    assert_eq!(summary.total_synchronized, 180);
    assert_eq!(summary.total_skipped, 2700);
    Ok(())
}

#[tokio::test]
async fn test_single_survivor_has_no_parent() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![entry("a", at(4, 9, 0), 3600, "[ABC-1] review")]),
        FakeConnector::target(&["ABC-1"]),
    );
    let run_id = ctx.start().await?;
    let summary = ctx.runtime.synchronizer().summary(ctx.runtime.user(), run_id)?;

    assert_eq!(summary.worklogs.len(), 1);
    assert_eq!(summary.worklogs[0].parent_id, None);
    assert_eq!(summary.worklogs[0].source_id.as_deref(), Some("a"));
    assert!(ctx
        .runtime
        .worklog_service()
        .members(ctx.runtime.user(), summary.worklogs[0].id)?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reingest_is_idempotent() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![
            entry("a", at(4, 9, 0), 60, "[ABC-1] review"),
            entry("b", at(4, 13, 0), 120, "[ABC-1] review"),
            entry("c", at(5, 10, 0), 900, "[ABC-1] standup"),
        ]),
        FakeConnector::target(&["ABC-1"]),
    );
    let user = ctx.runtime.user();
    let synchronizer = ctx.runtime.synchronizer();

    let run = synchronizer.create(user, Some(TOGGL), Some(JIRA), from())?;
    assert_eq!(synchronizer.import_phase(user, run.id).await?, 4);
    assert_eq!(synchronizer.import_phase(user, run.id).await?, 0);
    assert_eq!(synchronizer.summary(user, run.id)?.worklogs.len(), 2);

    synchronizer.export_phase(user, run.id).await?;
    let second = synchronizer.create(user, Some(TOGGL), Some(JIRA), from())?;
    assert_eq!(synchronizer.import_phase(user, second.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_entries_are_offered_again() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![
            entry("a", at(4, 9, 0), 60, "[ABC-1] review"),
            entry("d", at(5, 10, 0), 900, "coffee"),
        ]),
        FakeConnector::target(&["ABC-1"]),
    );
    let user = ctx.runtime.user();
    let synchronizer = ctx.runtime.synchronizer();

    let first = ctx.start().await?;
    synchronizer.export_phase(user, first).await?;

    let second = ctx.start().await?;
    let summary = synchronizer.summary(user, second)?;
    assert_eq!(summary.worklogs.len(), 1);
    assert_eq!(summary.worklogs[0].source_id.as_deref(), Some("d"));
    Ok(())
}

#[tokio::test]
async fn test_export_partial_failure_keeps_head() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![
            entry("a", at(4, 9, 0), 600, "[ABC-1] first"),
            entry("b", at(4, 10, 0), 600, "[ABC-2] second"),
            entry("c", at(4, 11, 0), 600, "[ABC-3] third"),
        ]),
        FakeConnector::target(&["ABC-1", "ABC-2", "ABC-3"]).failing_export_at(1),
    );
    let user = ctx.runtime.user();
    let run_id = ctx.start().await?;

    let result = ctx.runtime.synchronizer().export_phase(user, run_id).await;
    assert!(matches!(result, Err(WorklogError::ExportFailure { index: 1, .. })));

    let summary = ctx.runtime.synchronizer().summary(user, run_id)?;
    assert!(summary.run.is_active());
    let left: Vec<_> = summary.worklogs.iter().map(|w| w.source_id.as_deref()).collect();
    assert_eq!(left, vec![Some("a")]);

    let exported = ctx.target.exported();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].issue_id, "ABC-1");
    Ok(())
}

#[tokio::test]
async fn test_export_completes_and_marks_rejections() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![
            entry("a", at(4, 9, 0), 600, "[ABC-1] first"),
            entry("b", at(4, 10, 0), 600, "[ABC-2] second"),
        ]),
        FakeConnector::target(&["ABC-1", "ABC-2"]),
    );
    let user = ctx.runtime.user();
    let run_id = ctx.start().await?;

    // Point the second worklog at an issue the target does not have
    let summary = ctx.runtime.synchronizer().summary(user, run_id)?;
    let edited = ctx.runtime.worklog_service().edit_worklog(
        user,
        summary.worklogs[1].id,
        None,
        Some("NOPE-1".to_string()),
    )?;
    assert!(edited.is_valid);
    assert_eq!(edited.is_issue_confirmed, None);

    let report = ctx.runtime.synchronizer().export_phase(user, run_id).await?;
    assert_eq!(report.exported, 1);
    assert_eq!(report.rejected, 1);

    let summary = ctx.runtime.synchronizer().summary(user, run_id)?;
    assert!(summary.run.is_completed);
    assert!(!summary.worklogs[1].is_valid);
    assert_eq!(
        ctx.runtime.worklog_service().days_since_last_sync(user)?,
        Some(0)
    );
    Ok(())
}

#[tokio::test]
async fn test_cancel_completed_run_fails() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![entry("a", at(4, 9, 0), 600, "[ABC-1] first")]),
        FakeConnector::target(&["ABC-1"]),
    );
    let user = ctx.runtime.user();
    let run_id = ctx.start().await?;
    ctx.runtime.synchronizer().export_phase(user, run_id).await?;

    let result = ctx.runtime.synchronizer().cancel(user, run_id).await;
    assert!(matches!(result, Err(WorklogError::AlreadyCompleted(id)) if id == run_id));

    let summary = ctx.runtime.synchronizer().summary(user, run_id)?;
    assert!(summary.run.is_completed);
    assert!(!summary.run.is_cancelled);
    assert_eq!(summary.worklogs.len(), 1);

    let again = ctx.runtime.synchronizer().export_phase(user, run_id).await;
    assert!(matches!(again, Err(WorklogError::InactiveRun(_))));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_run_cannot_be_exported() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![entry("a", at(4, 9, 0), 600, "[ABC-1] first")]),
        FakeConnector::target(&["ABC-1"]),
    );
    let user = ctx.runtime.user();
    let synchronizer = ctx.runtime.synchronizer();
    let run_id = ctx.start().await?;

    synchronizer.cancel(user, run_id).await?;
    // Cancelling twice is harmless
    synchronizer.cancel(user, run_id).await?;

    let summary = synchronizer.summary(user, run_id)?;
    assert!(summary.run.is_cancelled);
    assert!(summary.worklogs.is_empty());

    assert!(matches!(
        synchronizer.export_phase(user, run_id).await,
        Err(WorklogError::InactiveRun(id)) if id == run_id
    ));
    assert!(matches!(
        synchronizer.import_phase(user, run_id).await,
        Err(WorklogError::InactiveRun(_))
    ));
    assert!(ctx.target.exported().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_import_discards_run() {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::failing_import(),
        FakeConnector::target(&["ABC-1"]),
    );
    let result = ctx.start().await;
    assert!(matches!(result, Err(WorklogError::Connector(_))));

    let runs = ctx.runtime.synchronizer().runs(ctx.runtime.user()).unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn test_invalid_selection() {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::default(),
        FakeConnector::default(),
    );
    let user = ctx.runtime.user();
    let synchronizer = ctx.runtime.synchronizer();

    assert!(matches!(
        synchronizer.create(user, None, Some(JIRA), from()),
        Err(WorklogError::InvalidSelection(_))
    ));
    assert!(matches!(
        synchronizer.create(user, Some(TOGGL), Some(TOGGL), from()),
        Err(WorklogError::InvalidSelection(_))
    ));
    assert!(matches!(
        synchronizer.create(user, Some(TOGGL), Some(42), from()),
        Err(WorklogError::NotFound(_))
    ));
    assert!(synchronizer.runs(user).unwrap().is_empty());
}

#[tokio::test]
async fn test_search_issues_falls_back_to_term() -> Result<(), WorklogError> {
    let ctx = SynchronizationTestContext::new(
        FakeConnector::source(vec![]),
        FakeConnector::target(&["ABC-1", "ABC-2", "XYZ-9"]),
    );
    let user = ctx.runtime.user();
    let run_id = ctx.start().await?;
    let synchronizer = ctx.runtime.synchronizer();

    let found = synchronizer.search_issues(user, run_id, "ABC").await?;
    assert_eq!(found.len(), 2);

    let fallback = synchronizer.search_issues(user, run_id, " QQ-7 ").await?;
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].id, "QQ-7");
    assert_eq!(fallback[0].label, "Use \"QQ-7\" as issue ID");

    assert!(synchronizer.search_issues(user, run_id, "   ").await?.is_empty());
    Ok(())
}
