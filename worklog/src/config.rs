use crate::connection::CredentialSource;
use crate::date;
use crate::error::WorklogError;
use crate::parser::DEFAULT_ISSUE_ID_PATTERN;
use crate::types::{ProviderConnection, UserContext};
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";
const REDACTED: &str = "********";

/// Application configuration struct
/// Holds the user settings, the location of the local database and the
/// provider accounts to synchronize between
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct AppConfiguration {
    #[serde(default)]
    pub user: UserConfiguration,

    /// Ensures the database file name is filled in, even if the Toml file
    /// does not have an `application_data` section
    #[serde(default = "default_application_data")]
    pub application_data: ApplicationData,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionConfiguration>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct UserConfiguration {
    #[serde(default = "default_user_id")]
    pub id: i64,
    /// IANA name, e.g. `Europe/Oslo`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_issue_id_pattern")]
    pub issue_id_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
}

impl Default for UserConfiguration {
    fn default() -> Self {
        UserConfiguration {
            id: default_user_id(),
            timezone: default_timezone(),
            issue_id_pattern: default_issue_id_pattern(),
            default_target: None,
        }
    }
}

/// Holds the configuration for the `application_data` section of the Toml file
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ApplicationData {
    /// The path to the local worklog data store
    pub local_worklog: String,
}

impl Default for ApplicationData {
    fn default() -> Self {
        ApplicationData {
            local_worklog: worklog_file().to_string_lossy().to_string(),
        }
    }
}

/// One `[[connections]]` entry
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ConnectionConfiguration {
    pub id: i64,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub password: String,
    /// Seconds before a request to the provider is given up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Gitlab: also import `subtracted` time notes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub full_history: bool,
}

impl AppConfiguration {
    /// # Errors
    /// If the configured timezone is unknown
    pub fn user_context(&self) -> Result<UserContext, WorklogError> {
        Ok(UserContext {
            id: self.user.id,
            timezone: date::parse_timezone(&self.user.timezone)?,
            issue_id_pattern: self.user.issue_id_pattern.clone(),
            default_target: self.user.default_target.clone(),
        })
    }

    /// A copy safe for printing, with tokens and passwords blanked out
    #[must_use]
    pub fn redacted(&self) -> AppConfiguration {
        let mut cfg = self.clone();
        for connection in &mut cfg.connections {
            for secret in [&mut connection.api_token, &mut connection.password] {
                if !secret.is_empty() {
                    *secret = REDACTED.to_string();
                }
            }
        }
        cfg
    }

    fn to_connection(&self, c: &ConnectionConfiguration) -> ProviderConnection {
        ProviderConnection {
            id: c.id,
            name: c.name.clone(),
            provider: c.provider.clone(),
            server: c.server.clone(),
            login: c.login.clone(),
            api_token: c.api_token.clone(),
            password: c.password.clone(),
            timeout_secs: c.timeout_secs,
            full_history: c.full_history,
            user_id: self.user.id,
        }
    }
}

impl CredentialSource for AppConfiguration {
    fn connection(&self, id: i64) -> Result<ProviderConnection, WorklogError> {
        self.connections
            .iter()
            .find(|c| c.id == id)
            .map(|c| self.to_connection(c))
            .ok_or_else(|| WorklogError::NotFound(format!("connection {id}")))
    }

    fn connections(&self) -> Vec<ProviderConnection> {
        self.connections
            .iter()
            .map(|c| self.to_connection(c))
            .collect()
    }
}

/// Filename holding the application configuration parameters
#[must_use]
pub fn configuration_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from(CONFIG_FILE_NAME),
        |dirs| dirs.preference_dir().join(CONFIG_FILE_NAME),
    )
}

/// Filename of the Sqlite DBMS holding the local repo of work logs
#[must_use]
pub fn worklog_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("worklog.db"),
        |dirs| dirs.data_dir().join("worklog.db"),
    )
}

#[allow(clippy::missing_errors_doc)]
pub fn load() -> Result<AppConfiguration, WorklogError> {
    read(&configuration_file())
}

#[allow(clippy::missing_errors_doc)]
pub fn save(cfg: &AppConfiguration) -> Result<()> {
    create_configuration_file(cfg, &configuration_file())
}

#[allow(clippy::missing_errors_doc)]
pub fn application_config_to_string(cfg: &AppConfiguration) -> Result<String> {
    Ok(toml::to_string::<AppConfiguration>(cfg)?)
}

fn default_application_data() -> ApplicationData {
    ApplicationData::default()
}

fn default_user_id() -> i64 {
    1
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_issue_id_pattern() -> String {
    DEFAULT_ISSUE_ID_PATTERN.to_string()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "norn", "worklog-sync")
}

/// Reads the `Application` configuration struct from the supplied TOML file
fn read(path: &Path) -> Result<AppConfiguration, WorklogError> {
    let mut file = File::open(path).map_err(|source| WorklogError::ApplicationConfig {
        path: path.into(),
        source,
    })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|source| WorklogError::ApplicationConfig {
            path: path.into(),
            source,
        })?;
    toml::from_str::<AppConfiguration>(&contents).map_err(|source| WorklogError::TomlParse {
        path: path.into(),
        source,
    })
}

fn create_configuration_file(cfg: &AppConfiguration, path: &Path) -> Result<()> {
    if let Some(directory) = path.parent() {
        if !directory.as_os_str().is_empty() && !directory.try_exists()? {
            fs::create_dir_all(directory)?;
        }
    }

    let mut file = File::create(path).map_err(|_src_err| WorklogError::ConfigFileCreation {
        path: path.to_path_buf(),
    })?;
    let toml = application_config_to_string(cfg)?;
    file.write_all(toml.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_parsing() {
        let toml_str = r#"
        [user]
        id = 7
        timezone = "Europe/Oslo"
        default_target = "Jira"

        [application_data]
        local_worklog = "worklog.db"

        [[connections]]
        id = 1
        name = "My Toggl"
        provider = "Toggl"
        api_token = "abc"

        [[connections]]
        id = 2
        name = "Work Jira"
        provider = "Jira"
        server = "example.atlassian.net"
        login = "me@example.com"
        api_token = "def"
        timeout_secs = 10

        [[connections]]
        id = 3
        name = "Gitlab"
        provider = "Gitlab"
        server = "gitlab.example.com"
        api_token = "ghi"
        full_history = true
        "#;

        let app_config: AppConfiguration = toml::from_str(toml_str).unwrap();
        assert_eq!(app_config.application_data.local_worklog, "worklog.db");
        assert_eq!(app_config.user.id, 7);
        assert_eq!(app_config.user.issue_id_pattern, DEFAULT_ISSUE_ID_PATTERN);
        assert_eq!(app_config.connections.len(), 3);
        assert_eq!(app_config.connections[0].server, "");

        let jira = app_config.connection(2).unwrap();
        assert_eq!(jira.provider, "Jira");
        assert_eq!(jira.user_id, 7);
        assert_eq!(jira.fields().timeout(), std::time::Duration::from_secs(10));
        assert!(!jira.fields().full_history);

        let gitlab = app_config.connection(3).unwrap();
        assert!(gitlab.fields().full_history);
        assert_eq!(gitlab.timeout_secs, None);
        assert!(matches!(
            app_config.connection(4),
            Err(WorklogError::NotFound(_))
        ));
    }

    /// The `user` and `application_data` sections get reasonable defaults even
    /// if they do not exist in the configuration file on disk
    #[test]
    fn test_toml_parsing_with_defaults_generated() {
        let app_config: AppConfiguration = toml::from_str("").unwrap();
        assert_eq!(
            app_config.application_data.local_worklog,
            worklog_file().to_string_lossy()
        );
        assert_eq!(app_config.user, UserConfiguration::default());
        assert!(app_config.connections.is_empty());

        let user = app_config.user_context().unwrap();
        assert_eq!(user.timezone, chrono_tz::UTC);
        assert_eq!(user.default_target, None);
    }

    #[test]
    fn unknown_timezone_fails_user_context() {
        let app_config: AppConfiguration =
            toml::from_str("[user]\ntimezone = \"Nowhere/Special\"").unwrap();
        assert!(matches!(
            app_config.user_context(),
            Err(WorklogError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn redacted_hides_secrets() {
        let mut cfg = AppConfiguration::default();
        cfg.connections.push(ConnectionConfiguration {
            id: 1,
            name: "Odoo".to_string(),
            provider: "Odoo".to_string(),
            server: "https://odoo.example.com:prod".to_string(),
            login: "me".to_string(),
            api_token: String::new(),
            password: "secret".to_string(),
            timeout_secs: None,
            full_history: false,
        });
        let listed = application_config_to_string(&cfg.redacted()).unwrap();
        assert!(!listed.contains("secret"));
        assert!(listed.contains(REDACTED));
    }

    #[test]
    fn test_write_and_read_toml_file() -> Result<()> {
        let tmp_config_file = std::env::temp_dir()
            .join("worklog-sync-test")
            .join("test-config.toml");

        let mut cfg = AppConfiguration::default();
        cfg.user.default_target = Some("Gitlab".to_string());
        cfg.application_data.local_worklog = "worklog.db".to_string();

        create_configuration_file(&cfg, &tmp_config_file)?;
        let result = read(&tmp_config_file)?;
        assert_eq!(cfg, result);

        Ok(())
    }
}
