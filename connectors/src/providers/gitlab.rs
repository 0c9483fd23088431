//! Gitlab adapter. Spent time is mined from issue notes on import and
//! written back with `/spend` quick actions on export.
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use log::{debug, info, warn};

use crate::client::{server_url, Credentials, HttpClient};
use crate::models::gitlab::{Issue, Note};
use crate::providers::time_notes::mine_notes;
use crate::{
    ConnectionFields, Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion,
    RawEntry, Result,
};

const PER_PAGE: &str = "100";

pub struct GitlabConnector {
    http: HttpClient,
    full_history: bool,
    now: Option<DateTime<FixedOffset>>,
}

impl GitlabConnector {
    /// # Errors
    /// If the server is missing or does not make up a valid URL
    pub fn new(fields: &ConnectionFields) -> Result<Self> {
        if fields.server.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration(
                "Gitlab needs a server".to_string(),
            ));
        }
        let base = format!("{}/api/v4/", server_url(&fields.server));
        let http = HttpClient::new(
            &base,
            Credentials::Header("Private-Token", fields.api_token.clone()),
        )?
        .with_timeout(fields.timeout());
        Ok(Self::with_http(http).with_full_history(fields.full_history))
    }

    #[must_use]
    pub fn with_http(http: HttpClient) -> Self {
        GitlabConnector {
            http,
            full_history: false,
            now: None,
        }
    }

    /// Also honour `subtracted ... of time spent` notes
    #[must_use]
    pub fn with_full_history(mut self, full_history: bool) -> Self {
        self.full_history = full_history;
        self
    }

    /// Pins the instant used for notes without an explicit date
    #[must_use]
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.now.unwrap_or_else(|| Utc::now().into())
    }

    async fn issues_updated_after(&self, start: DateTime<FixedOffset>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut page = 1;
        loop {
            let query = [
                ("scope", "all".to_string()),
                (
                    "updated_after",
                    start.to_rfc3339_opts(SecondsFormat::Secs, false),
                ),
                ("page", page.to_string()),
                ("per_page", PER_PAGE.to_string()),
            ];
            let batch = self.http.get::<Vec<Issue>>("issues", &query).await?;
            if batch.is_empty() {
                break;
            }
            debug!("Issues page {page} holds {} issues", batch.len());
            issues.extend(batch);
            page += 1;
        }
        Ok(issues)
    }

    async fn notes(&self, project_id: i64, iid: i64) -> Result<Vec<Note>> {
        let endpoint = format!("projects/{project_id}/issues/{iid}/notes");
        let mut notes = Vec::new();
        let mut page = 1;
        loop {
            let query = [
                ("page", page.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("sort", "asc".to_string()),
            ];
            let batch = self.http.get::<Vec<Note>>(&endpoint, &query).await?;
            if batch.is_empty() {
                break;
            }
            notes.extend(batch);
            page += 1;
        }
        Ok(notes)
    }
}

/// Splits `group/project#12` into the url encoded project path and the issue iid
///
/// # Errors
/// If there is no `#` or either side is empty
pub fn split_reference(issue_id: &str) -> Result<(String, String)> {
    match issue_id.split_once('#') {
        Some((project, iid)) if !project.is_empty() && !iid.is_empty() => {
            Ok((urlencoding::encode(project).into_owned(), iid.to_string()))
        }
        _ => Err(ConnectorError::InvalidIssueReference(issue_id.to_string())),
    }
}

/// Human readable duration understood by `/spend`, e.g. `3h6m2s`
#[must_use]
pub fn human_duration(seconds: i64) -> String {
    if seconds < 0 {
        return format!("-{}", human_duration(-seconds));
    }
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    if minutes == 0 {
        format!("{seconds}s")
    } else if minutes < 60 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{}h{}m{seconds}s", minutes / 60, minutes % 60)
    }
}

#[async_trait]
impl Connector for GitlabConnector {
    async fn import_worklogs(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>> {
        let issues = self.issues_updated_after(start).await?;
        info!("Found {} Gitlab issues to check", issues.len());

        let now = self.now();
        let mut entries = Vec::new();
        for issue in issues {
            let notes = self.notes(issue.project_id, issue.iid).await?;
            entries.extend(mine_notes(
                &notes,
                issue.project_id,
                issue.iid,
                self.full_history,
                now,
            ));
        }
        Ok(entries
            .into_iter()
            .filter(|e| e.date_started >= start && e.date_started <= end)
            .collect())
    }

    async fn export_worklogs(&self, worklogs: &[ExportWorklog]) -> Result<ExportOutcome> {
        for (index, worklog) in worklogs.iter().enumerate() {
            let (project, iid) = match split_reference(&worklog.issue_id) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("{e}");
                    return Ok(ExportOutcome::PartialFailure {
                        index,
                        rejected: Vec::new(),
                        reason: e.to_string(),
                    });
                }
            };
            let body = format!(
                "/spend {} {}",
                human_duration(worklog.duration),
                worklog.date_started.format("%Y-%m-%d")
            );
            let endpoint = format!("projects/{project}/issues/{iid}/notes");
            // Gitlab answers quick action notes inconsistently, only transport errors count
            match self
                .http
                .post_form(&endpoint, vec![("body".to_string(), body)])
                .await
            {
                Ok(status) => debug!("Spend note on {} answered {status}", worklog.issue_id),
                Err(e) => {
                    return Ok(ExportOutcome::PartialFailure {
                        index,
                        rejected: Vec::new(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(ExportOutcome::Completed {
            rejected: Vec::new(),
        })
    }

    async fn validate_issue(&self, issue_id: &str) -> Result<bool> {
        let Ok((project, iid)) = split_reference(issue_id) else {
            return Ok(false);
        };
        match self
            .http
            .get::<serde_json::Value>(&format!("projects/{project}/issues/{iid}"), &[])
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn search_issues(&self, term: &str) -> Result<Vec<IssueSuggestion>> {
        let query = [("scope", "all".to_string()), ("search", term.to_string())];
        let issues = self.http.get::<Vec<Issue>>("issues", &query).await?;
        Ok(issues
            .into_iter()
            .filter_map(|issue| {
                issue.references.map(|r| IssueSuggestion {
                    id: r.full,
                    label: issue.title,
                })
            })
            .collect())
    }
}
