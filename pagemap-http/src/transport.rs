//! The reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use tracing::debug;

use pagemap_core::{
    error::{PageStoreError, PageStoreResult},
    session::AuthToken,
    transport::{ApiRequest, Method, Transport},
};

/// Builder for [`HttpTransport`] instances.
#[derive(Debug)]
pub struct HttpTransportBuilder {
    token: AuthToken,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    /// Sets a per-request timeout. Timed-out requests surface as transient
    /// failures and are retried by the session.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Permanent`] if the underlying client
    /// cannot be constructed.
    pub fn build(self) -> PageStoreResult<HttpTransport> {
        let mut client = reqwest::Client::builder();

        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        let client = client.build().map_err(|err| PageStoreError::Permanent {
            status: None,
            message: format!("failed to build http client: {err}"),
        })?;

        Ok(HttpTransport {
            client,
            base_url: self.base_url,
            token: self.token,
        })
    }
}

/// A transport that performs API requests over HTTPS.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: AuthToken,
}

impl HttpTransport {
    /// Creates a builder for a transport rooted at the given API base URL.
    pub fn builder(token: AuthToken, base_url: impl Into<String>) -> HttpTransportBuilder {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        HttpTransportBuilder {
            token,
            base_url,
            timeout: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: ApiRequest) -> PageStoreResult<Json> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };

        let url = self.url(&request.path);
        debug!(%method, %url, "dispatching request");

        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(self.token.expose());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();

        let body = response.text().await.map_err(map_send_error)?;

        if !(200..300).contains(&status) {
            return Err(PageStoreError::from_status(status, body));
        }

        serde_json::from_str(&body)
            .map_err(|_| PageStoreError::decode("response body is not valid json"))
    }
}

/// Maps a connection-level failure onto the error taxonomy.
///
/// Timeouts and connect failures are transient; everything else at this
/// level (bad URLs, TLS setup, redirect loops) is permanent.
fn map_send_error(err: reqwest::Error) -> PageStoreError {
    if err.is_timeout() {
        PageStoreError::Transient {
            status: Some(408),
            message: format!("request timed out: {err}"),
        }
    } else if err.is_connect() {
        PageStoreError::Transient {
            status: Some(503),
            message: format!("connection failed: {err}"),
        }
    } else {
        PageStoreError::Permanent {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let token = AuthToken::new("t").unwrap();
        let transport = HttpTransport::builder(token, "https://api.example.com/v1/")
            .build()
            .unwrap();

        assert_eq!(transport.url("pages"), "https://api.example.com/v1/pages");
    }
}
