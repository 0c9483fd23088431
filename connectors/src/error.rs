use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::{RetryDecision, RetryableError};

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Connector with name {0} is not implemented")]
    UnknownProvider(String),
    #[error("{operation} is not supported by {provider}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },
    #[error("Issue reference '{0}' is not well formed")]
    InvalidIssueReference(String),
    #[error("Invalid connection settings: {0}")]
    InvalidConfiguration(String),
    #[error("Unauthorized, check the login and token of the connection")]
    Unauthorized,
    #[error("Not found: '{0}'")]
    NotFound(String),
    #[error("Provider answered {status}: {body}")]
    Fault { status: StatusCode, body: String },
    #[error("XML-RPC fault {code}: {message}")]
    RpcFault { code: i64, message: String },
    #[error("Unexpected response: {0}")]
    MalformedResponse(String),
    #[error("Internal error in reqwest library: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Could not serialize/deserialize: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unable to parse the url: {0}")]
    Url(#[from] url::ParseError),
}

impl ConnectorError {
    /// True if the provider told us the addressed resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectorError::NotFound(_))
    }
}

impl RetryableError for ConnectorError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            ConnectorError::Request(e) if e.is_timeout() || e.is_connect() => RetryDecision::Retry,
            ConnectorError::Fault { status, .. }
                if *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::BAD_GATEWAY
                    || *status == StatusCode::SERVICE_UNAVAILABLE
                    || *status == StatusCode::GATEWAY_TIMEOUT =>
            {
                RetryDecision::Retry
            }
            _ => RetryDecision::NoRetry,
        }
    }
}
