//! A typed object-mapping layer over a remote page-database web API.
//!
//! This crate is the core of the pagemap project and provides:
//!
//! - **Schema layer** ([`schema`]) - Declarative field definitions bound to a remote database
//! - **Value codec** ([`value`]) - Bidirectional mapping between typed values and wire properties
//! - **Rich text** ([`text`]) - Annotated text spans shared by properties and blocks
//! - **Content blocks** ([`block`]) - Discriminated structured content with nested children
//! - **Query builder** ([`query`]) - Immutable, schema-validated filter/sort construction
//! - **Records** ([`record`]) - Hydrated page objects with per-field change tracking
//! - **Transport abstraction** ([`transport`]) - The seam between the session and the wire
//! - **Retry policy** ([`retry`]) - Bounded exponential backoff for transient failures
//! - **Session** ([`session`]) - The authenticated connection and its identity-mapped cache
//! - **Users** ([`user`]) - Read-only workspace identities behind people properties
//! - **Cursors** ([`cursor`]) - Lazy, cursor-driven pagination over query results
//! - **Error handling** ([`error`]) - Error taxonomy and result types
//!
//! # Example
//!
//! ```ignore
//! use pagemap_core::{
//!     schema::{FieldDef, FieldKind, Schema, SchemaRegistry},
//!     session::{AuthToken, Session, SessionConfig},
//!     value::Value,
//! };
//! use uuid::Uuid;
//!
//! let tasks = Schema::builder("task", Uuid::new_v4())
//!     .field(FieldDef::new("title", FieldKind::Title).required())
//!     .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Checkbox(false)))
//!     .build()?;
//!
//! let registry = SchemaRegistry::builder().register(tasks).build()?;
//! let config = SessionConfig::new(AuthToken::new("secret-token")?);
//! let session = Session::new(config, registry.into(), transport);
//!
//! let task = session
//!     .create("task", vec![("title", Value::text("write the report"))])
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as pagemap_core;

pub mod block;
pub mod cursor;
pub mod error;
pub mod query;
pub mod record;
pub mod retry;
pub mod schema;
pub mod session;
pub mod text;
pub mod transport;
pub mod user;
pub mod value;
