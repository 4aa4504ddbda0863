//! Convenient re-exports of commonly used types from pagemap.
//!
//! Import this prelude module to quickly access the most frequently used
//! types without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use pagemap::prelude::*;
//! ```
//!
//! This provides access to:
//! - Schema definitions and the registry
//! - Typed values, rich text and content blocks
//! - Query construction and filtering
//! - The session, its configuration and cursors
//! - The transport seam and error types

pub use pagemap_core::{
    block::{Block, MAX_BLOCK_DEPTH},
    cursor::{BlockCursor, RecordCursor, UserCursor},
    error::{PageStoreError, PageStoreResult},
    query::{Condition, Expr, Filter, Query, Sort, SortDirection},
    record::{Record, RecordRef},
    retry::RetryPolicy,
    schema::{FieldDef, FieldKind, Schema, SchemaBuilder, SchemaRegistry, SchemaRegistryBuilder},
    session::{AuthToken, Session, SessionConfig, TOKEN_ENV},
    text::{Annotations, RichText},
    transport::{ApiRequest, Method, Transport},
    user::{User, UserKind},
    value::{DateValue, Value},
};
