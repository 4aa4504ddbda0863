//! The session: authenticated entry point for every remote operation.
//!
//! A [`Session`] owns a transport, a retry policy and an identity map of
//! live records. All reads and writes go through it:
//!
//! ```ignore
//! let config = SessionConfig::from_env()?;
//! let session = Session::new(config, registry, transport);
//!
//! let task = session.create("task", vec![("title", Value::text("ship it"))]).await?;
//! session.update(&task).await?;
//! ```
//!
//! # Identity map
//!
//! The session caches one [`RecordRef`] per `(model, id)` pair. Fetching a
//! page that is already cached refreshes the existing record in place and
//! returns the same handle, so all holders observe the new state. Local
//! edits survive a refresh; the server's values only move the baseline.
//! Deleting a record evicts it from the map.

use std::{
    collections::HashMap,
    env, fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::{Value as Json, json};
use tracing::debug;
use uuid::Uuid;

use crate::{
    block::{self, Block},
    cursor::{BlockCursor, RecordCursor, UserCursor},
    error::{PageStoreError, PageStoreResult},
    query::Query,
    record::{Record, RecordRef},
    retry::{self, RetryPolicy},
    schema::{Schema, SchemaRegistry},
    transport::{ApiRequest, Transport},
    user::User,
    value::Value,
};

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "PAGEMAP_API_TOKEN";

/// An API bearer token. Never printed; `Debug` output is redacted.
#[derive(Clone)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a token string.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Auth`] for a blank token, so a
    /// misconfigured environment fails at startup rather than with a 401
    /// on the first call.
    pub fn new(token: impl Into<String>) -> PageStoreResult<Self> {
        let token = token.into();

        if token.trim().is_empty() {
            return Err(PageStoreError::Auth("API token is blank".to_string()));
        }

        Ok(Self(token))
    }

    /// Reads the token from the `PAGEMAP_API_TOKEN` environment variable.
    pub fn from_env() -> PageStoreResult<Self> {
        let token = env::var(TOKEN_ENV)
            .map_err(|_| PageStoreError::Auth(format!("{TOKEN_ENV} is not set")))?;

        Self::new(token)
    }

    /// The raw token, for transports building authorization headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Session configuration: credentials, default page size, retry policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    token: AuthToken,
    page_size: usize,
    retry: RetryPolicy,
}

impl SessionConfig {
    pub fn new(token: AuthToken) -> Self {
        Self {
            token,
            page_size: 100,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a config with the token taken from the environment.
    pub fn from_env() -> PageStoreResult<Self> {
        Ok(Self::new(AuthToken::from_env()?))
    }

    /// Sets the page size used when a query does not specify one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// An authenticated session over one transport.
#[derive(Debug)]
pub struct Session<T: Transport> {
    config: SessionConfig,
    registry: Arc<SchemaRegistry>,
    transport: T,
    cache: Mutex<HashMap<(String, Uuid), RecordRef>>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig, registry: Arc<SchemaRegistry>, transport: T) -> Self {
        Self {
            config,
            registry,
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The schema registered for a model.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] for an unregistered model.
    pub fn model(&self, name: &str) -> PageStoreResult<Arc<Schema>> {
        Ok(self.registry.model(name)?.clone())
    }

    /// Performs one API call under the session's retry policy.
    pub(crate) async fn call(&self, request: ApiRequest) -> PageStoreResult<Json> {
        debug!(method = request.method.as_str(), path = %request.path, "api call");

        retry::with_retries(self.config.retry(), || self.transport.call(request.clone())).await
    }

    /// Fetches a page by id, returning the cached handle if one exists.
    pub async fn get(&self, model: &str, id: Uuid) -> PageStoreResult<RecordRef> {
        let schema = self.model(model)?;
        let page = self.call(ApiRequest::get(format!("pages/{id}"))).await?;

        self.admit(schema, &page)
    }

    /// Creates a page in the model's database and caches the result.
    ///
    /// Declared defaults fill unset fields; required fields must be present
    /// after defaults are applied.
    pub async fn create(
        &self,
        model: &str,
        values: Vec<(&str, Value)>,
    ) -> PageStoreResult<RecordRef> {
        let schema = self.model(model)?;
        let draft = Record::draft(schema.clone(), values)?;

        let body = json!({
            "parent": {
                "type": "database_id",
                "database_id": schema.database_id().to_string(),
            },
            "properties": draft.encode_new()?,
        });

        let page = self.call(ApiRequest::post("pages", body)).await?;
        self.admit(schema, &page)
    }

    /// Writes a record's dirty fields back to the store.
    ///
    /// A clean record is a no-op: no request is sent. On success the
    /// record absorbs the server's post-write state and becomes clean.
    pub async fn update(&self, record: &RecordRef) -> PageStoreResult<()> {
        let (id, properties) = {
            let guard = lock(record);
            (saved_id(&guard)?, guard.diff()?)
        };

        if properties.is_empty() {
            return Ok(());
        }

        let body = json!({ "properties": properties });
        let page = self.call(ApiRequest::patch(format!("pages/{id}"), body)).await?;

        lock(record).absorb(&page)
    }

    /// Archives a record (soft delete) and evicts it from the cache.
    pub async fn delete(&self, record: &RecordRef) -> PageStoreResult<()> {
        let (id, model) = {
            let guard = lock(record);
            (saved_id(&guard)?, guard.schema().model().to_string())
        };

        let body = json!({ "archived": true });
        let page = self.call(ApiRequest::patch(format!("pages/{id}"), body)).await?;

        lock(record).absorb(&page)?;
        self.evict(&model, id);

        Ok(())
    }

    /// Starts a lazy query over the schema's database.
    ///
    /// No request is sent until the cursor is first advanced.
    pub fn query(&self, query: Query) -> RecordCursor<'_, T> {
        RecordCursor::new(self, query)
    }

    /// Appends content blocks to a record's page, preserving order.
    pub async fn append_blocks(
        &self,
        record: &RecordRef,
        blocks: &[Block],
    ) -> PageStoreResult<()> {
        let id = saved_id(&lock(record))?;
        let body = json!({ "children": block::blocks_to_wire(blocks) });

        self.call(ApiRequest::patch(format!("blocks/{id}/children"), body))
            .await?;

        Ok(())
    }

    /// Starts a lazy listing of a record's content blocks.
    pub fn blocks(&self, record: &RecordRef) -> PageStoreResult<BlockCursor<'_, T>> {
        let id = saved_id(&lock(record))?;

        Ok(BlockCursor::new(self, id))
    }

    /// Resolves a user id, as found in people property values.
    pub async fn user(&self, id: Uuid) -> PageStoreResult<User> {
        let body = self.call(ApiRequest::get(format!("users/{id}"))).await?;

        User::from_wire(&body)
    }

    /// Starts a lazy listing of the workspace's users.
    pub fn users(&self) -> UserCursor<'_, T> {
        UserCursor::new(self)
    }

    /// Hydrates a page response into the identity map.
    ///
    /// If a record with the same `(model, id)` is already cached, it is
    /// refreshed in place and the existing handle is returned.
    pub(crate) fn admit(&self, schema: Arc<Schema>, page: &Json) -> PageStoreResult<RecordRef> {
        let record = Record::hydrate(schema.clone(), page)?;
        let id = record
            .id()
            .ok_or_else(|| PageStoreError::decode("page without an 'id'"))?;
        let key = (schema.model().to_string(), id);

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = cache.get(&key) {
            let existing = existing.clone();
            drop(cache);

            lock(&existing).refresh(page)?;
            return Ok(existing);
        }

        let fresh: RecordRef = Arc::new(Mutex::new(record));
        cache.insert(key, fresh.clone());

        Ok(fresh)
    }

    fn evict(&self, model: &str, id: Uuid) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&(model.to_string(), id));
    }
}

fn lock(record: &RecordRef) -> MutexGuard<'_, Record> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn saved_id(record: &Record) -> PageStoreResult<Uuid> {
    record.id().ok_or_else(|| {
        PageStoreError::Schema(format!(
            "record of model '{}' has not been saved",
            record.schema().model()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(matches!(AuthToken::new("  "), Err(PageStoreError::Auth(_))));
        assert!(AuthToken::new("secret-token").is_ok());
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = AuthToken::new("secret-token").unwrap();
        let printed = format!("{token:?}");

        assert!(!printed.contains("secret-token"));
        assert_eq!(token.expose(), "secret-token");
    }

    #[test]
    fn page_size_floor_is_one() {
        let config = SessionConfig::new(AuthToken::new("t").unwrap()).with_page_size(0);
        assert_eq!(config.page_size(), 1);
    }
}
