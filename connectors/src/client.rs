//! The HTTP plumbing shared by all adapters: base URL handling, credentials,
//! per-call timeout, retry of transient failures and mapping of HTTP status
//! codes into [`ConnectorError`].
use std::time::Duration;

use log::debug;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::retry::{with_retry, RetryConfig};
use crate::{ConnectorError, Result};

/// Default per-call timeout; a timed out call counts as a transient failure
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub enum Credentials {
    Anonymous,
    Basic(String, String),
    /// A token sent in a custom header, i.e. Gitlab's `Private-Token`
    Header(&'static str, String),
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Anonymous => request,
            Credentials::Basic(ref user, ref pass) => {
                request.basic_auth(user.to_owned(), Some(pass.to_owned()))
            }
            Credentials::Header(name, ref token) => request.header(*name, token.to_owned()),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Body {
    Empty,
    Json(String),
    Form(Vec<(String, String)>),
    Xml(String),
}

/// Turns the `server` field of a connection into a base URL.
/// A bare host name means `https://`; an explicit scheme is kept as is.
#[must_use]
pub fn server_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{server}")
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    credentials: Credentials,
    client: Client,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpClient {
    /// Creates a client for the API rooted at `base`. Endpoints are resolved
    /// relative to it, hence a trailing `/` is appended when missing.
    ///
    /// # Errors
    /// If `base` is not a valid URL
    pub fn new(base: &str, credentials: Credentials) -> Result<Self> {
        let base = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        Ok(HttpClient {
            base,
            credentials,
            client: Client::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: &Body,
    ) -> Result<(StatusCode, String)> {
        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        request = self.credentials.apply(request);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match body {
            Body::Empty => request,
            Body::Json(json) => request
                .header(CONTENT_TYPE, "application/json")
                .body(json.clone()),
            Body::Form(fields) => request.form(fields),
            Body::Xml(xml) => request.header(CONTENT_TYPE, "text/xml").body(xml.clone()),
        };
        debug!("request '{:?}'", request);

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("status {:?} body '{:?}'", status, text);

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            // Surfaced as an error so the retry loop gets to look at it
            return Err(ConnectorError::Fault { status, body: text });
        }
        Ok((status, text))
    }

    /// Sends a request, retrying transient failures, and hands back the raw
    /// status and body. Client errors are not interpreted.
    pub(crate) async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: &Body,
    ) -> Result<(StatusCode, String)> {
        let url = self.base.join(endpoint.trim_start_matches('/'))?;
        let operation = format!("{method} {}", url.path());
        with_retry(&self.retry, &operation, move || {
            self.send_once(method.clone(), url.clone(), query, body)
        })
        .await
    }

    async fn request<D>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: &Body,
    ) -> Result<D>
    where
        D: DeserializeOwned,
    {
        let (status, body) = self.send(method, endpoint, query, body).await?;
        match status {
            StatusCode::UNAUTHORIZED => Err(ConnectorError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ConnectorError::NotFound(endpoint.to_string())),
            client_err if client_err.is_client_error() => {
                Err(ConnectorError::Fault { status, body })
            }
            _ => {
                let data = if body.is_empty() { "null" } else { &body };
                Ok(serde_json::from_str::<D>(data)?)
            }
        }
    }

    /// # Errors
    /// On transport failures, unsuccessful status codes or undecodable bodies
    pub async fn get<D>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<D>
    where
        D: DeserializeOwned,
    {
        self.request::<D>(Method::GET, endpoint, query, &Body::Empty)
            .await
    }

    /// # Errors
    /// On transport failures, unsuccessful status codes or undecodable bodies
    pub async fn post<D, S>(&self, endpoint: &str, query: &[(&str, String)], body: &S) -> Result<D>
    where
        D: DeserializeOwned,
        S: Serialize,
    {
        let json = serde_json::to_string::<S>(body)?;
        self.request::<D>(Method::POST, endpoint, query, &Body::Json(json))
            .await
    }

    /// Posts form encoded data and reports the status code without judging it
    ///
    /// # Errors
    /// On transport failures only
    pub async fn post_form(
        &self,
        endpoint: &str,
        fields: Vec<(String, String)>,
    ) -> Result<StatusCode> {
        let (status, _) = self
            .send(Method::POST, endpoint, &[], &Body::Form(fields))
            .await?;
        Ok(status)
    }

    /// Posts an XML document and returns the XML answer
    ///
    /// # Errors
    /// On transport failures or unsuccessful status codes
    pub async fn post_xml(&self, endpoint: &str, xml: String) -> Result<String> {
        let (status, body) = self
            .send(Method::POST, endpoint, &[], &Body::Xml(xml))
            .await?;
        match status {
            StatusCode::NOT_FOUND => Err(ConnectorError::NotFound(endpoint.to_string())),
            s if !s.is_success() => Err(ConnectorError::Fault { status, body }),
            _ => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::Value;

    #[test]
    fn server_url_defaults_to_https() {
        assert_eq!(server_url("example.atlassian.net"), "https://example.atlassian.net");
        assert_eq!(server_url("http://localhost:1234/"), "http://localhost:1234");
    }

    #[test]
    fn timeout_comes_from_connection_settings() -> Result<()> {
        let fields = crate::ConnectionFields {
            timeout_secs: Some(5),
            ..Default::default()
        };
        let client = HttpClient::new("https://example.com", Credentials::Anonymous)?
            .with_timeout(fields.timeout());
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(crate::ConnectionFields::default().timeout(), DEFAULT_TIMEOUT);
        Ok(())
    }

    #[tokio::test]
    async fn not_found_is_mapped() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/thing")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(&format!("{}/api", server.url()), Credentials::Anonymous)?;
        let result = client.get::<Value>("thing", &[]).await;
        assert!(matches!(result, Err(ConnectorError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn service_unavailable_is_retried() -> Result<()> {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/api/thing")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = HttpClient::new(&format!("{}/api/", server.url()), Credentials::Anonymous)?
            .with_retry(RetryConfig {
                max_retries: 2,
                ..RetryConfig::quick()
            });
        let result = client.get::<Value>("thing", &[]).await;

        assert!(matches!(result, Err(ConnectorError::Fault { .. })));
        failing.assert_async().await;
        Ok(())
    }
}
