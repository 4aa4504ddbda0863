//! HTTP transport for pagemap.
//!
//! This crate provides [`HttpTransport`], a [`pagemap_core::transport::Transport`]
//! implementation backed by `reqwest`. It attaches the bearer token to every
//! request and maps HTTP failures onto the error taxonomy so the session's
//! retry policy can distinguish transient from permanent failures.
//!
//! # Quick Start
//!
//! ```ignore
//! use pagemap::{Session, SessionConfig, AuthToken, http::HttpTransport};
//!
//! let config = SessionConfig::from_env()?;
//! let transport = HttpTransport::builder(config.token().clone(), "https://api.example.com/v1")
//!     .timeout(std::time::Duration::from_secs(30))
//!     .build()?;
//!
//! let session = Session::new(config, registry, transport);
//! ```

#[allow(unused_extern_crates)]
extern crate self as pagemap_http;

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
