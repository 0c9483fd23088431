pub mod gitlab;
pub mod jira;
pub mod odoo;
pub mod time_notes;
pub mod toggl;

pub use gitlab::GitlabConnector;
pub use jira::JiraConnector;
pub use odoo::OdooConnector;
pub use toggl::TogglConnector;
