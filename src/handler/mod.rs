//! Handler module - requests, handlers and dispatch.
//!
//! Provides:
//! - [`Request`] - parsed query name and text arguments
//! - [`Handler`] - the answering capability, implemented by any type
//! - [`HandlerFn`] - adapter for plain async functions
//! - [`QueryMux`] - registry routing query names to handlers
//!
//! # Example
//!
//! ```ignore
//! use oraclewire::handler::{QueryMux, Request};
//!
//! let mux = QueryMux::new();
//!
//! // Register a function handler
//! mux.handle_func("hello", |req: Request| async move {
//!     Ok(format!("Hello, {}", req.arg("name").unwrap_or_default()))
//! })?;
//!
//! // Register an object handler
//! mux.handle("complex", ComplexObject { number: 42 })?;
//! ```

mod registry;
mod request;

pub use registry::{
    default_mux, handle, handle_func, BoxFuture, Handler, HandlerFn, HandlerResult, QueryMux,
};
pub use request::Request;
