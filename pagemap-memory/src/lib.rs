//! Scripted in-memory transport for pagemap.
//!
//! This crate provides [`StubTransport`], a transport that replays queued
//! responses instead of talking to a real API. It records every request it
//! receives, so tests can assert on request count, order, method, path and
//! body as well as on the session's observable behavior.
//!
//! # Quick Start
//!
//! ```ignore
//! use pagemap::{Session, SessionConfig, AuthToken, memory::StubTransport};
//!
//! let transport = StubTransport::new();
//! transport.respond_with(page_json).await;
//!
//! let session = Session::new(config, registry, transport.clone());
//! let task = session.get("task", id).await?;
//!
//! assert_eq!(transport.request_count().await, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as pagemap_memory;

pub mod transport;

pub use transport::StubTransport;
