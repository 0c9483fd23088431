//! Odoo timesheet adapter, speaking XML-RPC to `/xmlrpc/2/common` and
//! `/xmlrpc/2/object`.
//!
//! The connection's `server` field holds `"{url}:{database}"`. Issue
//! references take the form `"{project name}#{task ref_num}"`.
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use log::{debug, warn};
use tokio::sync::{Mutex, OnceCell};

use crate::client::{Credentials, HttpClient};
use crate::xmlrpc::{decode_response, encode_call, Value};
use crate::{
    ConnectionFields, Connector, ConnectorError, ExportOutcome, ExportWorklog, IssueSuggestion,
    RawEntry, Result,
};

const TIMESHEET_MODEL: &str = "hr.analytic.timesheet";

const TIMESHEET_FIELDS: [&str; 16] = [
    "reported_user_id",
    "state",
    "journal_id",
    "account_id",
    "general_account_id",
    "work_type",
    "date",
    "user_id",
    "product_id",
    "name",
    "task_id",
    "to_invoice",
    "amount",
    "unit_amount",
    "product_uom_id",
    "reported_hours",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Project {
    id: i64,
    account_id: i64,
}

pub struct OdooConnector {
    http: HttpClient,
    database: String,
    login: String,
    password: String,
    uid: OnceCell<i64>,
    projects: Mutex<HashMap<String, Project>>,
}

/// Splits `https://odoo.example.com:production` into url and database
fn split_server(server: &str) -> Result<(&str, &str)> {
    match server.trim().rsplit_once(':') {
        Some((url, db)) if !url.is_empty() && !db.is_empty() && !db.contains('/') => Ok((url, db)),
        _ => Err(ConnectorError::InvalidConfiguration(format!(
            "Odoo server '{server}' must look like 'url:database'"
        ))),
    }
}

fn split_reference(issue_id: &str) -> Result<(&str, &str)> {
    match issue_id.split_once('#') {
        Some((project, task)) if !project.is_empty() && !task.is_empty() => Ok((project, task)),
        _ => Err(ConnectorError::InvalidIssueReference(issue_id.to_string())),
    }
}

fn first_id(value: &Value) -> Option<i64> {
    value.as_array()?.first()?.as_i64()
}

fn domain(conditions: &[(&str, Value)]) -> Value {
    Value::Array(vec![Value::Array(
        conditions
            .iter()
            .map(|(field, v)| Value::Array(vec![Value::from(*field), Value::from("="), v.clone()]))
            .collect(),
    )])
}

impl OdooConnector {
    /// # Errors
    /// If the server field does not hold a url and a database
    pub fn new(fields: &ConnectionFields) -> Result<Self> {
        let (url, database) = split_server(&fields.server)?;
        let http = HttpClient::new(
            &format!("{}/xmlrpc/2/", url.trim_end_matches('/')),
            Credentials::Anonymous,
        )?
        .with_timeout(fields.timeout());
        Ok(Self::with_http(http, database, fields))
    }

    #[must_use]
    pub fn with_http(http: HttpClient, database: &str, fields: &ConnectionFields) -> Self {
        OdooConnector {
            http,
            database: database.to_string(),
            login: fields.login.clone(),
            password: fields.password.clone(),
            uid: OnceCell::new(),
            projects: Mutex::new(HashMap::new()),
        }
    }

    async fn call(&self, service: &str, method: &str, params: &[Value]) -> Result<Value> {
        let answer = self
            .http
            .post_xml(service, encode_call(method, params))
            .await?;
        decode_response(&answer)
    }

    async fn uid(&self) -> Result<i64> {
        self.uid
            .get_or_try_init(|| async {
                let uid = self
                    .call(
                        "common",
                        "authenticate",
                        &[
                            Value::from(self.database.as_str()),
                            Value::from(self.login.as_str()),
                            Value::from(self.password.as_str()),
                            Value::Struct(BTreeMap::new()),
                        ],
                    )
                    .await?;
                // A rejected login is answered with `false`
                uid.as_i64().ok_or(ConnectorError::Unauthorized)
            })
            .await
            .copied()
    }

    async fn execute(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Option<Value>,
    ) -> Result<Value> {
        let uid = self.uid().await?;
        let mut params = vec![
            Value::from(self.database.as_str()),
            Value::from(uid),
            Value::from(self.password.as_str()),
            Value::from(model),
            Value::from(method),
            args,
        ];
        if let Some(kwargs) = kwargs {
            params.push(kwargs);
        }
        debug!("execute_kw {model}.{method}");
        self.call("object", "execute_kw", &params).await
    }

    async fn project(&self, name: &str) -> Result<Project> {
        if let Some(project) = self.projects.lock().await.get(name) {
            return Ok(*project);
        }

        let found = self
            .execute(
                "project.project",
                "search",
                domain(&[("name", Value::from(name))]),
                None,
            )
            .await?;
        let id = first_id(&found)
            .ok_or_else(|| ConnectorError::NotFound(format!("project '{name}'")))?;

        let mut kwargs = BTreeMap::new();
        kwargs.insert(
            "fields".to_string(),
            Value::from(vec![
                Value::from("id"),
                Value::from("name"),
                Value::from("analytic_account_id"),
            ]),
        );
        let records = self
            .execute(
                "project.project",
                "read",
                Value::from(vec![Value::from(id)]),
                Some(Value::Struct(kwargs)),
            )
            .await?;
        let account_id = records
            .as_array()
            .and_then(|r| r.first())
            .and_then(Value::as_struct)
            .and_then(|p| p.get("analytic_account_id"))
            .and_then(first_id)
            .ok_or_else(|| {
                ConnectorError::MalformedResponse(format!(
                    "no analytic_account_id for project '{name}' ({id})"
                ))
            })?;

        let project = Project { id, account_id };
        self.projects
            .lock()
            .await
            .insert(name.to_string(), project);
        Ok(project)
    }

    async fn task(&self, project: &Project, ref_num: &str) -> Result<i64> {
        let found = self
            .execute(
                "project.task",
                "search",
                domain(&[
                    ("project_id", Value::from(project.id)),
                    ("ref_num", Value::from(ref_num)),
                ]),
                None,
            )
            .await?;
        first_id(&found).ok_or_else(|| {
            ConnectorError::NotFound(format!("task {ref_num} in project {}", project.id))
        })
    }

    async fn create_timesheet(&self, worklog: &ExportWorklog) -> Result<i64> {
        let (project_name, ref_num) = split_reference(&worklog.issue_id)?;
        let project = self.project(project_name).await?;
        let task_id = self.task(&project, ref_num).await?;

        let fields = TIMESHEET_FIELDS.iter().map(|f| Value::from(*f)).collect();
        let defaults = self
            .execute(
                TIMESHEET_MODEL,
                "default_get",
                Value::from(vec![Value::Array(fields)]),
                None,
            )
            .await?;
        let mut timesheet = defaults.as_struct().cloned().unwrap_or_default();
        timesheet.insert("task_id".into(), Value::from(task_id));
        timesheet.insert("name".into(), Value::from(worklog.comment.as_str()));
        timesheet.insert(
            "date".into(),
            Value::from(worklog.date_started.format("%Y-%m-%d").to_string()),
        );
        timesheet.insert("work_type".into(), Value::from("dev"));
        #[allow(clippy::cast_precision_loss)]
        let hours = worklog.duration as f64 / 3600.0;
        timesheet.insert("unit_amount".into(), Value::from(hours));
        timesheet.insert("account_id".into(), Value::from(project.account_id));

        let created = self
            .execute(
                TIMESHEET_MODEL,
                "create",
                Value::from(vec![Value::Struct(timesheet)]),
                None,
            )
            .await?;
        match created.as_i64() {
            Some(id) if id > 0 => Ok(id),
            _ => Err(ConnectorError::MalformedResponse(
                "no timesheet id returned".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Connector for OdooConnector {
    async fn import_worklogs(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<RawEntry>> {
        Err(ConnectorError::Unsupported {
            provider: "Odoo",
            operation: "import",
        })
    }

    async fn export_worklogs(&self, worklogs: &[ExportWorklog]) -> Result<ExportOutcome> {
        let mut rejected = Vec::new();
        for (index, worklog) in worklogs.iter().enumerate() {
            match self.create_timesheet(worklog).await {
                Ok(id) => debug!("Created timesheet {id} for {}", worklog.issue_id),
                Err(e) if e.is_not_found() => {
                    warn!("Task {} does not exist, worklog rejected", worklog.issue_id);
                    rejected.push(index);
                }
                Err(e) => {
                    let reason = match e {
                        ConnectorError::RpcFault { message, .. } => message,
                        other => other.to_string(),
                    };
                    warn!("Timesheet for {} failed: {reason}", worklog.issue_id);
                    return Ok(ExportOutcome::PartialFailure {
                        index,
                        rejected,
                        reason,
                    });
                }
            }
        }
        Ok(ExportOutcome::Completed { rejected })
    }

    async fn validate_issue(&self, issue_id: &str) -> Result<bool> {
        let Ok((project_name, ref_num)) = split_reference(issue_id) else {
            return Ok(false);
        };
        let project = match self.project(project_name).await {
            Ok(project) => project,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        match self.task(&project, ref_num).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn search_issues(&self, _term: &str) -> Result<Vec<IssueSuggestion>> {
        Ok(Vec::new())
    }
}
