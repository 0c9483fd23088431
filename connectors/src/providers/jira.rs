//! Jira Cloud / Server adapter. Jira is only ever a target: worklogs are
//! created through the REST API v2 and issue keys are validated against it.
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::client::{server_url, Credentials, HttpClient};
use crate::models::jira::{SearchResponse, WorklogInsert};
use crate::{
    ConnectionFields, Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion,
    RawEntry, Result,
};

lazy_static! {
    static ref ISSUE_KEY: Regex = Regex::new(r"(?:\s|^)([A-Z]+-[0-9]+)(?:\s|$)").unwrap();
}

pub struct JiraConnector {
    http: HttpClient,
}

impl JiraConnector {
    /// # Errors
    /// If the server does not make up a valid URL
    pub fn new(fields: &ConnectionFields) -> Result<Self> {
        if fields.server.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration(
                "Jira needs a server".to_string(),
            ));
        }
        let base = format!("{}/rest/api/2/", server_url(&fields.server));
        let http = HttpClient::new(
            &base,
            Credentials::Basic(fields.login.clone(), fields.api_token.clone()),
        )?
        .with_timeout(fields.timeout());
        Ok(JiraConnector { http })
    }

    #[must_use]
    pub fn with_http(http: HttpClient) -> Self {
        JiraConnector { http }
    }
}

/// Jira truncates to whole minutes, so anything short of a full minute is
/// rounded up to the next one
#[must_use]
pub fn round_up_to_minute(seconds: i64) -> i64 {
    if seconds.rem_euclid(60) == 0 {
        seconds
    } else {
        60 * (seconds.div_euclid(60) + 1)
    }
}

/// Formats a timestamp the way the worklog endpoint expects, e.g.
/// `2024-03-01T09:30:00.000+0100`
#[must_use]
pub fn jira_timestamp(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S.000%z").to_string()
}

fn search_jql(term: &str) -> String {
    let mut jql = format!(r#"summary ~ "{term}""#);
    if ISSUE_KEY.is_match(&term.to_uppercase()) {
        jql.push_str(&format!(r#" OR id = "{term}""#));
    }
    jql
}

#[async_trait]
impl Connector for JiraConnector {
    async fn import_worklogs(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>> {
        Err(ConnectorError::Unsupported {
            provider: "Jira",
            operation: "import",
        })
    }

    async fn export_worklogs(&self, worklogs: &[ExportWorklog]) -> Result<ExportOutcome> {
        let mut rejected = Vec::new();
        for (index, worklog) in worklogs.iter().enumerate() {
            let insert = WorklogInsert {
                started: jira_timestamp(&worklog.date_started),
                timeSpentSeconds: round_up_to_minute(worklog.duration),
                comment: worklog.comment.clone(),
            };
            let endpoint = format!("issue/{}/worklog", worklog.issue_id);
            let query = [("notifyUsers", "false".to_string())];
            match self
                .http
                .post::<serde_json::Value, WorklogInsert>(&endpoint, &query, &insert)
                .await
            {
                Ok(_) => debug!("Added worklog to {}", worklog.issue_id),
                Err(e) if e.is_not_found() => {
                    warn!("Issue {} does not exist, worklog rejected", worklog.issue_id);
                    rejected.push(index);
                }
                Err(e) => {
                    return Ok(ExportOutcome::PartialFailure {
                        index,
                        rejected,
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(ExportOutcome::Completed { rejected })
    }

    async fn validate_issue(&self, issue_id: &str) -> Result<bool> {
        match self
            .http
            .get::<serde_json::Value>(&format!("issue/{issue_id}/"), &[])
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn search_issues(&self, term: &str) -> Result<Vec<IssueSuggestion>> {
        let query = [
            ("jql", search_jql(term)),
            ("fields", "summary".to_string()),
        ];
        let response = self.http.get::<SearchResponse>("search", &query).await?;
        Ok(response
            .issues
            .into_iter()
            .map(|issue| IssueSuggestion {
                id: issue.key,
                label: issue.fields.summary,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn connector(url: &str) -> Result<JiraConnector> {
        let http = HttpClient::new(
            &format!("{url}/rest/api/2/"),
            Credentials::Basic("user".into(), "token".into()),
        )?
        .with_retry(RetryConfig::none());
        Ok(JiraConnector::with_http(http))
    }

    fn worklog(issue_id: &str, duration: i64) -> ExportWorklog {
        ExportWorklog {
            issue_id: issue_id.to_string(),
            date_started: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
                .unwrap(),
            duration,
            comment: "Code review".to_string(),
        }
    }

    #[test]
    fn rounds_up_to_whole_minutes() {
        for (seconds, expected) in [
            (0, 0),
            (1, 60),
            (59, 60),
            (60, 60),
            (300, 300),
            (301, 360),
            (1021, 1080),
        ] {
            assert_eq!(round_up_to_minute(seconds), expected, "for {seconds}");
        }
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(
            jira_timestamp(&worklog("A-1", 1).date_started),
            "2024-03-01T09:30:00.000+0100"
        );
    }

    #[test]
    fn jql_adds_key_clause_only_for_issue_keys() {
        assert_eq!(search_jql("login page"), r#"summary ~ "login page""#);
        assert_eq!(
            search_jql("abc-12"),
            r#"summary ~ "abc-12" OR id = "abc-12""#
        );
    }

    #[tokio::test]
    async fn import_is_unsupported() -> Result<()> {
        let jira = connector("http://localhost:1")?;
        let now = worklog("A-1", 1).date_started;
        let result = jira.import_worklogs(now, now).await;
        assert!(matches!(result, Err(ConnectorError::Unsupported { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn export_rejects_unknown_issue_and_continues() -> Result<()> {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("POST", "/rest/api/2/issue/TIME-1/worklog")
            .match_query(Matcher::UrlEncoded("notifyUsers".into(), "false".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "started": "2024-03-01T09:30:00.000+0100",
                "timeSpentSeconds": 360,
            })))
            .with_status(201)
            .with_body(r#"{"id":"1"}"#)
            .expect(2)
            .create_async()
            .await;
        let missing = server
            .mock("POST", "/rest/api/2/issue/NOPE-9/worklog")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let jira = connector(&server.url())?;
        let outcome = jira
            .export_worklogs(&[
                worklog("TIME-1", 301),
                worklog("NOPE-9", 60),
                worklog("TIME-1", 360),
            ])
            .await?;

        assert_eq!(outcome, ExportOutcome::Completed { rejected: vec![1] });
        ok.assert_async().await;
        missing.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn export_stops_at_first_hard_failure() -> Result<()> {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("POST", "/rest/api/2/issue/TIME-1/worklog")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let _broken = server
            .mock("POST", "/rest/api/2/issue/TIME-2/worklog")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("bad request")
            .create_async()
            .await;

        let jira = connector(&server.url())?;
        let outcome = jira
            .export_worklogs(&[
                worklog("TIME-1", 60),
                worklog("TIME-2", 60),
                worklog("TIME-1", 60),
            ])
            .await?;

        assert!(matches!(
            outcome,
            ExportOutcome::PartialFailure { index: 1, .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn validate_maps_not_found_to_false() -> Result<()> {
        let mut server = Server::new_async().await;
        let _found = server
            .mock("GET", "/rest/api/2/issue/TIME-1/")
            .with_status(200)
            .with_body(r#"{"key":"TIME-1"}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/rest/api/2/issue/TIME-2/")
            .with_status(404)
            .create_async()
            .await;
        let _denied = server
            .mock("GET", "/rest/api/2/issue/TIME-3/")
            .with_status(401)
            .create_async()
            .await;

        let jira = connector(&server.url())?;
        assert!(jira.validate_issue("TIME-1").await?);
        assert!(!jira.validate_issue("TIME-2").await?);
        assert!(matches!(
            jira.validate_issue("TIME-3").await,
            Err(ConnectorError::Unauthorized)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn search_maps_key_and_summary() -> Result<()> {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("jql".into(), r#"summary ~ "login""#.into()),
                Matcher::UrlEncoded("fields".into(), "summary".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"issues":[{"key":"WEB-7","fields":{"summary":"Fix login"}}]}"#)
            .create_async()
            .await;

        let jira = connector(&server.url())?;
        let found = jira.search_issues("login").await?;
        assert_eq!(
            found,
            vec![IssueSuggestion {
                id: "WEB-7".into(),
                label: "Fix login".into()
            }]
        );
        Ok(())
    }
}
