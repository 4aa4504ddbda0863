//! The scripted stub transport.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value as Json;

use pagemap_core::{
    error::{PageStoreError, PageStoreResult},
    transport::{ApiRequest, Transport},
};

#[derive(Debug, Default)]
struct StubState {
    responses: VecDeque<PageStoreResult<Json>>,
    requests: Vec<ApiRequest>,
}

/// A transport that replays queued responses and records every request.
///
/// Responses are consumed in FIFO order, one per call. Cloning shares the
/// queue and the request log, so a test can keep a handle for assertions
/// while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct StubTransport {
    state: Arc<RwLock<StubState>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful JSON response.
    pub async fn respond_with(&self, body: Json) {
        self.state.write().await.responses.push_back(Ok(body));
    }

    /// Queues a failure.
    pub async fn fail_with(&self, error: PageStoreError) {
        self.state.write().await.responses.push_back(Err(error));
    }

    /// The requests received so far, in order.
    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.state.read().await.requests.clone()
    }

    /// The number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.state.read().await.requests.len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn call(&self, request: ApiRequest) -> PageStoreResult<Json> {
        let mut state = self.state.write().await;
        state.requests.push(request);

        state.responses.pop_front().unwrap_or_else(|| {
            Err(PageStoreError::Permanent {
                status: None,
                message: "stub transport has no response queued".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn responses_replay_in_order_and_requests_are_recorded() {
        let transport = StubTransport::new();
        transport.respond_with(json!({ "n": 1 })).await;
        transport.respond_with(json!({ "n": 2 })).await;

        let first = transport.call(ApiRequest::get("pages/a")).await.unwrap();
        let second = transport
            .call(ApiRequest::post("pages", json!({})))
            .await
            .unwrap();

        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "pages/a");
    }

    #[tokio::test]
    async fn an_empty_queue_is_a_permanent_failure() {
        let transport = StubTransport::new();
        let err = transport.call(ApiRequest::get("pages/a")).await.unwrap_err();

        assert!(!err.is_transient());
    }
}
