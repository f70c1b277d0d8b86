//! # oraclewire
//!
//! Query dispatch and polling engine for oracle-style request/response
//! channels.
//!
//! Callers post queries such as `hello:name=Ada` to a backend. An [`Oracle`]
//! polls the backend for them, parses each one into a [`Request`], routes it
//! to the handler registered for its name and submits the answer back.
//!
//! ## Architecture
//!
//! - **Handlers** ([`handler`]): the [`QueryMux`] registry maps query names
//!   to async functions or [`Handler`] objects
//! - **Query language** ([`query`]): the pluggable [`QueryParser`], with the
//!   `name:key=value,...` grammar as default
//! - **Payloads** ([`codec`]): decoding of transport-encoded query payloads
//! - **Backend** ([`channel`]): the [`OracleChannel`] trait that hides node
//!   communication, plus an in-memory implementation
//! - **Loop** ([`Oracle`]): registration, polling, per-item fault isolation
//!   and cancellation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oraclewire::channel::InMemoryChannel;
//! use oraclewire::{Oracle, QueryMux, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mux = QueryMux::new();
//!     mux.handle_func("hello", |req: Request| async move {
//!         Ok(format!("Hello, {}", req.arg("name").unwrap_or_default()))
//!     })?;
//!
//!     let channel = Arc::new(InMemoryChannel::new());
//!     let mut oracle = Oracle::builder("ok_demo", channel).handler(mux).build();
//!
//!     oracle.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod handler;
pub mod query;

mod config;
mod oracle;
mod outcome;

pub use channel::{OracleChannel, OracleId, QueryId};
pub use config::{OracleConfig, DEFAULT_POLL_INTERVAL};
pub use error::{OracleError, Result};
pub use handler::{handle, handle_func, default_mux, Handler, QueryMux, Request};
pub use oracle::{Oracle, OracleBuilder, OracleHandle, OracleState};
pub use outcome::{ItemOutcome, ItemStatus, PollReport, SkipReason};
pub use query::{DefaultQueryParser, QueryParser};
