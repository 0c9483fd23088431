use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use connectors::RawEntry;
use worklog::config::{AppConfiguration, ConnectionConfiguration, UserConfiguration};
use worklog::parser::DEFAULT_ISSUE_ID_PATTERN;

use crate::test_helpers::common::{GITLAB, JIRA, TOGGL};

fn connection(id: i64, name: &str, provider: &str) -> ConnectionConfiguration {
    ConnectionConfiguration {
        id,
        name: name.to_string(),
        provider: provider.to_string(),
        server: String::new(),
        login: String::new(),
        api_token: "token".to_string(),
        password: String::new(),
        timeout_secs: None,
        full_history: false,
    }
}

pub fn test_configuration() -> AppConfiguration {
    AppConfiguration {
        user: UserConfiguration {
            id: 1,
            timezone: "Europe/Oslo".to_string(),
            issue_id_pattern: DEFAULT_ISSUE_ID_PATTERN.to_string(),
            default_target: Some("Jira".to_string()),
        },
        connections: vec![
            connection(TOGGL, "Time tracker", "Toggl"),
            connection(JIRA, "Work Jira", "Jira"),
            connection(GITLAB, "Gitlab", "gitlab"),
        ],
        ..Default::default()
    }
}

/// A point in time during the first week of March 2024, Oslo winter time
pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, day, hour, minute, 0)
        .unwrap()
}

pub fn entry(source_id: &str, start: DateTime<FixedOffset>, seconds: i64, comment: &str) -> RawEntry {
    RawEntry {
        source_id: source_id.to_string(),
        duration: seconds,
        date_created: Some(start + Duration::seconds(seconds)),
        date_started: start,
        date_stopped: start + Duration::seconds(seconds),
        comment: comment.to_string(),
        issue_id: None,
        project_id: None,
    }
}
