//! Maps provider names onto adapters. The set of providers is closed, adding
//! one means adding a [`ProviderKind`] variant.
use std::fmt::{Display, Formatter};

use crate::providers::{GitlabConnector, JiraConnector, OdooConnector, TogglConnector};
use crate::{ConnectionFields, Connector, ConnectorError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Jira,
    Toggl,
    Gitlab,
    Odoo,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Jira,
        ProviderKind::Toggl,
        ProviderKind::Gitlab,
        ProviderKind::Odoo,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Jira => "Jira",
            ProviderKind::Toggl => "Toggl",
            ProviderKind::Gitlab => "Gitlab",
            ProviderKind::Odoo => "Odoo",
        }
    }

    /// Case-insensitive lookup by provider name
    #[must_use]
    pub fn from_name(name: &str) -> Option<ProviderKind> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// The connection settings a provider makes use of
    #[must_use]
    pub fn form_fields(self) -> &'static [&'static str] {
        match self {
            ProviderKind::Jira => &["name", "server", "login", "api_token"],
            ProviderKind::Toggl => &["name", "api_token"],
            ProviderKind::Gitlab => &["name", "server", "api_token"],
            ProviderKind::Odoo => &["name", "server", "login", "password"],
        }
    }

    #[must_use]
    pub fn can_import(self) -> bool {
        matches!(self, ProviderKind::Toggl | ProviderKind::Gitlab)
    }

    #[must_use]
    pub fn can_export(self) -> bool {
        !matches!(self, ProviderKind::Toggl)
    }

    /// # Errors
    /// If the connection settings are unusable for this provider
    pub fn connect(self, fields: &ConnectionFields) -> Result<Box<dyn Connector>> {
        Ok(match self {
            ProviderKind::Jira => Box::new(JiraConnector::new(fields)?),
            ProviderKind::Toggl => Box::new(TogglConnector::new(fields)?),
            ProviderKind::Gitlab => Box::new(GitlabConnector::new(fields)?),
            ProviderKind::Odoo => Box::new(OdooConnector::new(fields)?),
        })
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub struct ConnectorRegistry;

impl ConnectorRegistry {
    #[must_use]
    pub fn kind(name: &str) -> Option<ProviderKind> {
        ProviderKind::from_name(name)
    }

    /// Builds the adapter registered under `name`
    ///
    /// # Errors
    /// `UnknownProvider` for names outside the registry, or whatever the
    /// adapter reports about the connection settings
    pub fn create(name: &str, fields: &ConnectionFields) -> Result<Box<dyn Connector>> {
        Self::kind(name)
            .ok_or_else(|| ConnectorError::UnknownProvider(name.to_string()))?
            .connect(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(ConnectorRegistry::kind("jira"), Some(ProviderKind::Jira));
        assert_eq!(ConnectorRegistry::kind("TOGGL"), Some(ProviderKind::Toggl));
        assert_eq!(ConnectorRegistry::kind(" GitLab "), Some(ProviderKind::Gitlab));
        assert_eq!(ConnectorRegistry::kind("odoo"), Some(ProviderKind::Odoo));
        assert_eq!(ConnectorRegistry::kind("Harvest"), None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = ConnectorRegistry::create("Harvest", &ConnectionFields::default());
        assert!(matches!(result, Err(ConnectorError::UnknownProvider(name)) if name == "Harvest"));
    }

    #[test]
    fn creates_known_providers() {
        let fields = ConnectionFields {
            server: "example.atlassian.net".into(),
            login: "me".into(),
            api_token: "token".into(),
            password: String::new(),
            ..Default::default()
        };
        assert!(ConnectorRegistry::create("jira", &fields).is_ok());
        assert!(ConnectorRegistry::create("Toggl", &fields).is_ok());
        assert!(ConnectorRegistry::create("gitlab", &fields).is_ok());
        // Odoo wants "url:database"
        assert!(ConnectorRegistry::create("odoo", &fields).is_err());
    }

    #[test]
    fn form_fields_name_the_used_settings() {
        assert!(ProviderKind::Toggl.form_fields().contains(&"api_token"));
        assert!(!ProviderKind::Toggl.form_fields().contains(&"server"));
        assert!(ProviderKind::Odoo.form_fields().contains(&"password"));
    }
}
