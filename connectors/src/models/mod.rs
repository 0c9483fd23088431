//! Wire payloads of the HTTP based providers
pub mod gitlab;
pub mod jira;
pub mod toggl;
