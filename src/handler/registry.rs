//! Query registry for dispatching requests by query name.
//!
//! The [`QueryMux`] maps query names to handlers. It is itself a [`Handler`],
//! so muxes can be nested or swapped for any custom dispatcher.
//!
//! # Example
//!
//! ```
//! use oraclewire::handler::QueryMux;
//! use oraclewire::Request;
//!
//! # tokio_test_block(async {
//! let mux = QueryMux::new();
//!
//! mux.handle_func("hello", |req: Request| async move {
//!     let name = req.arg("name").unwrap_or_else(|| "stranger".to_string());
//!     Ok(format!("Hello, {}", name))
//! })
//! .unwrap();
//!
//! let answer = mux.answer(Request::with_args("hello", [("name", "Ada")])).await;
//! assert_eq!(answer.unwrap(), "Hello, Ada");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::Request;
use crate::error::{OracleError, Result};

/// Result type for handler functions.
pub type HandlerResult = Result<String>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answers oracle queries.
///
/// Return `Err` for any application failure (validation, forbidden input,
/// lookup miss). The oracle treats errors as a normal per-item outcome.
pub trait Handler: Send + Sync + 'static {
    /// Produce the answer text for a request.
    fn answer(&self, request: Request) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that lets a plain async function serve as a [`Handler`].
pub struct HandlerFn<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> HandlerFn<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Wrap a function.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Handler for HandlerFn<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn answer(&self, request: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(request))
    }
}

/// Registry mapping query names to handlers.
///
/// Registration and lookup may run from different tasks. A lookup racing a
/// registration sees either the map before or after it, never a partial one.
#[derive(Default)]
pub struct QueryMux {
    entries: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl QueryMux {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a query name.
    ///
    /// # Errors
    ///
    /// - [`OracleError::EmptyQueryName`] if `query` is empty.
    /// - [`OracleError::DuplicateQuery`] if `query` is already registered.
    ///   The existing handler stays in place.
    pub fn handle<H: Handler>(&self, query: &str, handler: H) -> Result<()> {
        if query.is_empty() {
            return Err(OracleError::EmptyQueryName);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(query) {
            return Err(OracleError::DuplicateQuery(query.to_string()));
        }

        entries.insert(query.to_string(), Arc::new(handler));
        tracing::debug!("registered handler for query {:?}", query);
        Ok(())
    }

    /// Register an async function as the handler for a query name.
    ///
    /// # Errors
    ///
    /// Same as [`QueryMux::handle`].
    pub fn handle_func<F, Fut>(&self, query: &str, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle(query, HandlerFn::new(handler))
    }

    /// Get the handler registered for a query name.
    pub fn get_handler(&self, query: &str) -> Option<Arc<dyn Handler>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(query).cloned()
    }

    /// Returns true if a handler is registered for `query`.
    pub fn contains(&self, query: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(query)
    }

    /// Registered query names, sorted.
    pub fn queries(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered queries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch a request to the handler registered for its query.
    ///
    /// Returns [`OracleError::UnknownQuery`] when no handler matches;
    /// otherwise the handler's result is returned unchanged.
    pub async fn answer(&self, request: Request) -> HandlerResult {
        // Clone the handler out so the lock is not held across the await.
        let handler = self
            .get_handler(request.query())
            .ok_or_else(|| OracleError::UnknownQuery(request.query().to_string()))?;

        handler.answer(request).await
    }
}

impl Handler for QueryMux {
    fn answer(&self, request: Request) -> BoxFuture<'static, HandlerResult> {
        let handler = self.get_handler(request.query());
        Box::pin(async move {
            match handler {
                Some(h) => h.answer(request).await,
                None => Err(OracleError::UnknownQuery(request.query().to_string())),
            }
        })
    }
}

static DEFAULT_MUX: Lazy<Arc<QueryMux>> = Lazy::new(|| Arc::new(QueryMux::new()));

/// The process-wide default registry.
///
/// Created on first use and alive for the rest of the process. Oracles built
/// without an explicit handler dispatch through it.
pub fn default_mux() -> Arc<QueryMux> {
    DEFAULT_MUX.clone()
}

/// Register a handler on the default registry.
///
/// # Errors
///
/// Same as [`QueryMux::handle`].
pub fn handle<H: Handler>(query: &str, handler: H) -> Result<()> {
    DEFAULT_MUX.handle(query, handler)
}

/// Register an async function on the default registry.
///
/// # Errors
///
/// Same as [`QueryMux::handle`].
pub fn handle_func<F, Fut>(query: &str, handler: F) -> Result<()>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    DEFAULT_MUX.handle_func(query, handler)
}
