//! The transport seam between the session and the remote HTTP API.
//!
//! The session builds [`ApiRequest`] values describing each API call and
//! hands them to a [`Transport`]. Production code plugs in an HTTP client;
//! tests plug in a scripted stub and assert on the captured requests.

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::error::PageStoreResult;

/// HTTP method of an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// One API call: method, path relative to the API root, query parameters,
/// optional JSON body.
///
/// Query parameters are carried as structured pairs, not spliced into the
/// path; URL encoding is the transport's concern, so opaque values (such
/// as pagination cursors) pass through unmangled.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Json>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Json) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Json) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Adds a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Carrier for API requests.
///
/// Implementations map failures onto the error taxonomy: connection-level
/// and rate-limit failures become transient errors the session will retry,
/// everything else is permanent.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Performs one request and returns the decoded JSON response body.
    async fn call(&self, request: ApiRequest) -> PageStoreResult<Json>;
}

#[async_trait]
impl<T: Transport> Transport for &T {
    async fn call(&self, request: ApiRequest) -> PageStoreResult<Json> {
        (*self).call(request).await
    }
}
