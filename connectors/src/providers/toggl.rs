//! Toggl Track adapter. Toggl is a pure source of time entries.
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};
use log::debug;

use crate::client::{Credentials, HttpClient};
use crate::models::toggl::TimeEntry;
use crate::{
    ConnectionFields, Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion,
    RawEntry, Result,
};

pub const TOGGL_API: &str = "https://api.track.toggl.com/api/v8/";

pub struct TogglConnector {
    http: HttpClient,
}

impl TogglConnector {
    /// # Errors
    /// If no api token is configured
    pub fn new(fields: &ConnectionFields) -> Result<Self> {
        Self::with_base_url(TOGGL_API, fields)
    }

    /// # Errors
    /// If no api token is configured or `base` is not a URL
    pub fn with_base_url(base: &str, fields: &ConnectionFields) -> Result<Self> {
        if fields.api_token.is_empty() {
            return Err(ConnectorError::InvalidConfiguration(
                "Toggl needs an api token".to_string(),
            ));
        }
        // Toggl expects the token as user name and the literal "api_token" as password
        let http = HttpClient::new(
            base,
            Credentials::Basic(fields.api_token.clone(), "api_token".to_string()),
        )?
        .with_timeout(fields.timeout());
        Ok(TogglConnector { http })
    }

    #[must_use]
    pub fn with_http(http: HttpClient) -> Self {
        TogglConnector { http }
    }
}

impl From<TimeEntry> for RawEntry {
    fn from(entry: TimeEntry) -> Self {
        let stop = entry
            .stop
            .unwrap_or_else(|| entry.start + Duration::seconds(entry.duration));
        RawEntry {
            source_id: entry.id.to_string(),
            duration: entry.duration,
            date_created: entry.at,
            date_started: entry.start,
            date_stopped: stop,
            comment: entry.description.unwrap_or_default(),
            issue_id: None,
            project_id: None,
        }
    }
}

#[async_trait]
impl Connector for TogglConnector {
    async fn import_worklogs(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>> {
        let query = [
            (
                "start_date",
                start.to_rfc3339_opts(SecondsFormat::Secs, false),
            ),
            ("end_date", end.to_rfc3339_opts(SecondsFormat::Secs, false)),
        ];
        let entries = self
            .http
            .get::<Vec<TimeEntry>>("time_entries", &query)
            .await?;
        debug!("Toggl returned {} time entries", entries.len());

        // A running timer carries a negative duration
        Ok(entries
            .into_iter()
            .filter(|e| e.duration > 0)
            .map(RawEntry::from)
            .collect())
    }

    async fn export_worklogs(&self, _worklogs: &[ExportWorklog]) -> Result<ExportOutcome> {
        Err(ConnectorError::Unsupported {
            provider: "Toggl",
            operation: "export",
        })
    }

    async fn validate_issue(&self, _issue_id: &str) -> Result<bool> {
        Err(ConnectorError::Unsupported {
            provider: "Toggl",
            operation: "issue validation",
        })
    }

    async fn search_issues(&self, _term: &str) -> Result<Vec<IssueSuggestion>> {
        Ok(Vec::new())
    }
}
