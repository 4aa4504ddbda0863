//! Main pagemap crate providing a typed mapping layer over a remote
//! page-database web API.
//!
//! This crate is the primary entry point for users of the pagemap framework.
//! It re-exports the core types from various sub-crates and provides access
//! to the available transports.
//!
//! # Features
//!
//! - **Declarative schemas** - Describe each database's fields once and get
//!   validated, typed access everywhere
//! - **Change tracking** - Records remember their last-synced state; updates
//!   send only what changed
//! - **Identity map** - One shared handle per page, so every reader observes
//!   the same state
//! - **Composable queries** - Filter and sort expressions validated against
//!   the schema before anything is sent
//! - **Lazy pagination** - Cursors fetch pages on demand and never prefetch
//!
//! # Quick Start
//!
//! ```ignore
//! use pagemap::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> PageStoreResult<()> {
//!     let tasks = Schema::builder("task", database_id)
//!         .field(FieldDef::new("title", FieldKind::Title).required())
//!         .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Checkbox(false)))
//!         .field(FieldDef::new("due", FieldKind::Date).mapped_to("Due Date"))
//!         .build()?;
//!
//!     let registry = std::sync::Arc::new(SchemaRegistry::builder().register(tasks).build()?);
//!
//!     let config = SessionConfig::from_env()?;
//!     let transport = pagemap::http::HttpTransport::builder(
//!         config.token().clone(),
//!         "https://api.example.com/v1",
//!     )
//!     .build()?;
//!     let session = Session::new(config, registry, transport);
//!
//!     // Create a page; the checkbox default is applied on the wire.
//!     let task = session
//!         .create("task", vec![("title", Value::text("write the report"))])
//!         .await?;
//!
//!     // Edit and sync; only the changed property is sent.
//!     task.lock().unwrap().set("done", Value::Checkbox(true))?;
//!     session.update(&task).await?;
//!
//!     // Query lazily; each page of results is fetched on demand.
//!     let schema = session.model("task")?;
//!     let mut open = session.query(
//!         Query::new(schema)
//!             .filter(Filter::eq("done", Value::Checkbox(false)))?
//!             .sort("due", SortDirection::Ascending)?,
//!     );
//!
//!     while let Some(record) = open.next().await? {
//!         println!("{:?}", record.lock().unwrap().get("title"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Transports
//!
//! - [`memory`] - Scripted stub transport for development and testing
//! - [`http`] - HTTPS transport backed by `reqwest` (requires the `http`
//!   feature)

pub mod prelude;

pub use pagemap_core::{block, cursor, error, query, record, retry, schema, session, text, transport, user, value};

/// Scripted in-memory transport implementations.
pub mod memory {
    pub use pagemap_memory::StubTransport;
}

/// HTTP transport implementations.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http {
    pub use pagemap_http::{HttpTransport, HttpTransportBuilder};
}
