//! Parsed query request passed to handlers.
//!
//! A [`Request`] carries the query name and its arguments. Arguments are kept
//! as plain text; handlers convert them explicitly with [`Request::arg_as`].
//!
//! # Example
//!
//! ```
//! use oraclewire::Request;
//!
//! let req = Request::new("hello");
//! assert!(!req.has_args());
//!
//! req.set_arg("name", "Ada");
//! req.set_arg("age", "36");
//!
//! assert_eq!(req.arg("name").as_deref(), Some("Ada"));
//! assert_eq!(req.arg_as::<u32>("age").unwrap(), 36);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use crate::error::{OracleError, Result};

/// A parsed oracle query.
///
/// # Thread Safety
///
/// Argument writes go through an exclusive lock, so a parser may populate the
/// request while another task holds a reference to it. Readers never observe
/// a half-written map entry.
pub struct Request {
    /// Query name used for dispatch.
    query: String,
    /// Arguments, created on first write.
    args: RwLock<Option<HashMap<String, String>>>,
}

impl Request {
    /// Create a request without arguments.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            args: RwLock::new(None),
        }
    }

    /// Create a request from a query name and argument pairs.
    pub fn with_args<I, K, V>(query: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let req = Self::new(query);
        for (k, v) in args {
            req.set_arg(k, v);
        }
        req
    }

    /// Get the query name.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Set an argument, replacing any previous value for the key.
    pub fn set_arg(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut guard = self.args.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    /// Returns true if the request carries at least one argument.
    pub fn has_args(&self) -> bool {
        let guard = self.args.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Get an argument value by key.
    pub fn arg(&self, key: &str) -> Option<String> {
        let guard = self.args.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|m| m.get(key).cloned())
    }

    /// Convert an argument to `T` using its `FromStr` implementation.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::ArgumentType`] if the key is missing or the
    /// value does not parse.
    pub fn arg_as<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.arg(key).ok_or_else(|| OracleError::ArgumentType {
            key: key.to_string(),
            reason: "missing".to_string(),
        })?;

        raw.parse::<T>().map_err(|e| OracleError::ArgumentType {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Snapshot of all arguments.
    pub fn args(&self) -> HashMap<String, String> {
        let guard = self.args.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone().unwrap_or_default()
    }
}

impl Clone for Request {
    fn clone(&self) -> Self {
        let guard = self.args.read().unwrap_or_else(PoisonError::into_inner);
        Self {
            query: self.query.clone(),
            args: RwLock::new(guard.clone()),
        }
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.args() == other.args()
    }
}

impl Eq for Request {}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("args", &self.args())
            .finish()
    }
}
