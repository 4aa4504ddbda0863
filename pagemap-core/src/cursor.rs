//! Lazy cursors over paginated list responses.
//!
//! A cursor holds the items of the most recent page and the opaque
//! continuation token. The first request is deferred until the cursor is
//! advanced, and the next page is fetched only when the buffer runs dry.
//! Items surface in the store's order, both within and across pages.

use std::collections::VecDeque;

use serde_json::Value as Json;
use uuid::Uuid;

use crate::{
    block::Block,
    error::{PageStoreError, PageStoreResult},
    query::Query,
    record::RecordRef,
    session::Session,
    transport::{ApiRequest, Transport},
    user::User,
};

/// Reads the `has_more`/`next_cursor` boundary of a list response.
///
/// A response claiming more results without a continuation token is
/// malformed; surfacing it as a decode error beats silently truncating.
fn page_boundary(response: &Json) -> PageStoreResult<(bool, Option<String>)> {
    let has_more = response
        .get("has_more")
        .and_then(Json::as_bool)
        .unwrap_or(false);
    let next_cursor = response
        .get("next_cursor")
        .and_then(Json::as_str)
        .map(str::to_string);

    if has_more && next_cursor.is_none() {
        return Err(PageStoreError::decode(
            "list claims has_more without a next_cursor",
        ));
    }

    Ok((has_more, next_cursor))
}

fn results(response: &Json) -> PageStoreResult<&Vec<Json>> {
    response
        .get("results")
        .and_then(Json::as_array)
        .ok_or_else(|| PageStoreError::decode("list without a 'results' array"))
}

/// A lazy cursor over the records matching a query.
#[derive(Debug)]
pub struct RecordCursor<'a, T: Transport> {
    session: &'a Session<T>,
    query: Query,
    buffer: VecDeque<RecordRef>,
    next_cursor: Option<String>,
    exhausted: bool,
}

impl<'a, T: Transport> RecordCursor<'a, T> {
    pub(crate) fn new(session: &'a Session<T>, query: Query) -> Self {
        Self {
            session,
            query,
            buffer: VecDeque::new(),
            next_cursor: None,
            exhausted: false,
        }
    }

    /// Yields the next matching record, fetching a page only when the
    /// buffer is empty. Returns `Ok(None)` once the listing is exhausted.
    pub async fn next(&mut self) -> PageStoreResult<Option<RecordRef>> {
        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        Ok(self.buffer.pop_front())
    }

    /// Drains the cursor into a vector, preserving order.
    pub async fn collect_all(mut self) -> PageStoreResult<Vec<RecordRef>> {
        let mut records = Vec::new();

        while let Some(record) = self.next().await? {
            records.push(record);
        }

        Ok(records)
    }

    async fn fetch_page(&mut self) -> PageStoreResult<()> {
        let mut query = self.query.clone();

        if query.page_size().is_none() {
            query = query.limit(self.session.config().page_size());
        }

        if let Some(cursor) = &self.next_cursor {
            query = query.starting_after(cursor.clone());
        }

        let schema = self.query.schema().clone();
        let path = format!("databases/{}/query", schema.database_id());
        let response = self
            .session
            .call(ApiRequest::post(path, query.to_wire()?))
            .await?;

        for page in results(&response)? {
            self.buffer.push_back(self.session.admit(schema.clone(), page)?);
        }

        let (has_more, next_cursor) = page_boundary(&response)?;
        self.exhausted = !has_more;
        self.next_cursor = next_cursor;

        Ok(())
    }
}

/// A lazy cursor over the content blocks of one page.
#[derive(Debug)]
pub struct BlockCursor<'a, T: Transport> {
    session: &'a Session<T>,
    page_id: Uuid,
    buffer: VecDeque<Block>,
    next_cursor: Option<String>,
    exhausted: bool,
}

impl<'a, T: Transport> BlockCursor<'a, T> {
    pub(crate) fn new(session: &'a Session<T>, page_id: Uuid) -> Self {
        Self {
            session,
            page_id,
            buffer: VecDeque::new(),
            next_cursor: None,
            exhausted: false,
        }
    }

    /// Yields the next block in document order.
    pub async fn next(&mut self) -> PageStoreResult<Option<Block>> {
        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        Ok(self.buffer.pop_front())
    }

    /// Drains the cursor into a vector, preserving document order.
    pub async fn collect_all(mut self) -> PageStoreResult<Vec<Block>> {
        let mut blocks = Vec::new();

        while let Some(block) = self.next().await? {
            blocks.push(block);
        }

        Ok(blocks)
    }

    async fn fetch_page(&mut self) -> PageStoreResult<()> {
        let mut request = ApiRequest::get(format!("blocks/{}/children", self.page_id))
            .with_query("page_size", self.session.config().page_size().to_string());

        if let Some(cursor) = &self.next_cursor {
            request = request.with_query("start_cursor", cursor.clone());
        }

        let response = self.session.call(request).await?;

        for fragment in results(&response)? {
            self.buffer.push_back(Block::from_wire(fragment)?);
        }

        let (has_more, next_cursor) = page_boundary(&response)?;
        self.exhausted = !has_more;
        self.next_cursor = next_cursor;

        Ok(())
    }
}

/// A lazy cursor over the workspace's users.
#[derive(Debug)]
pub struct UserCursor<'a, T: Transport> {
    session: &'a Session<T>,
    buffer: VecDeque<User>,
    next_cursor: Option<String>,
    exhausted: bool,
}

impl<'a, T: Transport> UserCursor<'a, T> {
    pub(crate) fn new(session: &'a Session<T>) -> Self {
        Self {
            session,
            buffer: VecDeque::new(),
            next_cursor: None,
            exhausted: false,
        }
    }

    /// Yields the next user in the listing.
    pub async fn next(&mut self) -> PageStoreResult<Option<User>> {
        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        Ok(self.buffer.pop_front())
    }

    /// Drains the cursor into a vector, preserving order.
    pub async fn collect_all(mut self) -> PageStoreResult<Vec<User>> {
        let mut users = Vec::new();

        while let Some(user) = self.next().await? {
            users.push(user);
        }

        Ok(users)
    }

    async fn fetch_page(&mut self) -> PageStoreResult<()> {
        let mut request = ApiRequest::get("users")
            .with_query("page_size", self.session.config().page_size().to_string());

        if let Some(cursor) = &self.next_cursor {
            request = request.with_query("start_cursor", cursor.clone());
        }

        let response = self.session.call(request).await?;

        for fragment in results(&response)? {
            self.buffer.push_back(User::from_wire(fragment)?);
        }

        let (has_more, next_cursor) = page_boundary(&response)?;
        self.exhausted = !has_more;
        self.next_cursor = next_cursor;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boundary_requires_a_cursor_when_more_remains() {
        let truncated = json!({ "object": "list", "results": [], "has_more": true, "next_cursor": null });
        assert!(page_boundary(&truncated).is_err());

        let done = json!({ "object": "list", "results": [], "has_more": false, "next_cursor": null });
        assert_eq!(page_boundary(&done).unwrap(), (false, None));

        let more = json!({ "object": "list", "results": [], "has_more": true, "next_cursor": "abc" });
        assert_eq!(page_boundary(&more).unwrap(), (true, Some("abc".to_string())));
    }
}
