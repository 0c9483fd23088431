use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use connectors::{
    Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion, RawEntry,
};
use worklog::connection::ConnectorFactory;
use worklog::error::WorklogError;
use worklog::types::ProviderConnection;

/// An in-memory provider. Serves `entries`, knows `issues` and records what
/// it was sent.
#[derive(Default)]
pub struct FakeConnector {
    entries: Vec<RawEntry>,
    issues: Vec<String>,
    fail_export_at: Option<usize>,
    fail_import: bool,
    exported: Mutex<Vec<ExportWorklog>>,
}

impl FakeConnector {
    pub fn source(entries: Vec<RawEntry>) -> Self {
        FakeConnector {
            entries,
            ..Default::default()
        }
    }

    pub fn target(issues: &[&str]) -> Self {
        FakeConnector {
            issues: issues.iter().map(|s| (*s).to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_export_at(mut self, index: usize) -> Self {
        self.fail_export_at = Some(index);
        self
    }

    pub fn failing_import() -> Self {
        FakeConnector {
            fail_import: true,
            ..Default::default()
        }
    }

    pub fn exported(&self) -> Vec<ExportWorklog> {
        self.exported.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn import_worklogs(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>, ConnectorError> {
        if self.fail_import {
            return Err(ConnectorError::MalformedResponse("<html>".to_string()));
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| e.date_started >= start && e.date_started <= end)
            .cloned()
            .collect())
    }

    async fn export_worklogs(
        &self,
        worklogs: &[ExportWorklog],
    ) -> Result<ExportOutcome, ConnectorError> {
        let mut rejected = Vec::new();
        for (index, worklog) in worklogs.iter().enumerate() {
            if self.fail_export_at == Some(index) {
                return Ok(ExportOutcome::PartialFailure {
                    index,
                    rejected,
                    reason: "Service Unavailable".to_string(),
                });
            }
            if self.issues.contains(&worklog.issue_id) {
                self.exported.lock().unwrap().push(worklog.clone());
            } else {
                rejected.push(index);
            }
        }
        Ok(ExportOutcome::Completed { rejected })
    }

    async fn validate_issue(&self, issue_id: &str) -> Result<bool, ConnectorError> {
        Ok(self.issues.iter().any(|i| i == issue_id))
    }

    async fn search_issues(&self, term: &str) -> Result<Vec<IssueSuggestion>, ConnectorError> {
        Ok(self
            .issues
            .iter()
            .filter(|i| i.contains(term))
            .map(|i| IssueSuggestion {
                id: i.clone(),
                label: format!("{i}: Known issue"),
            })
            .collect())
    }
}

/// Hands out the fakes registered per connection id
#[derive(Default)]
pub struct FakeConnectorFactory {
    connectors: Mutex<HashMap<i64, Arc<dyn Connector>>>,
}

impl FakeConnectorFactory {
    pub fn with(self, connection_id: i64, connector: Arc<dyn Connector>) -> Self {
        self.connectors
            .lock()
            .unwrap()
            .insert(connection_id, connector);
        self
    }
}

impl ConnectorFactory for FakeConnectorFactory {
    fn create(&self, connection: &ProviderConnection) -> Result<Arc<dyn Connector>, WorklogError> {
        self.connectors
            .lock()
            .unwrap()
            .get(&connection.id)
            .cloned()
            .ok_or_else(|| WorklogError::UnknownProvider(connection.provider.clone()))
    }
}
