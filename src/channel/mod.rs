//! Channel module - the boundary to the external request/response backend.
//!
//! The oracle never talks to a node directly. Registration, fetching pending
//! queries and submitting responses all go through an [`OracleChannel`].
//! Signing, transaction building and confirmation waiting live behind it.
//!
//! [`InMemoryChannel`] is a complete in-process backend for local runs and
//! tests.

mod memory;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::InMemoryChannel;

/// Public identity of an oracle on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(String);

impl OracleId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the oracle identity from an account address.
    ///
    /// Oracle keys share the account key; only the `ak_` prefix becomes `ok_`.
    pub fn from_account_address(address: &str) -> Self {
        Self(address.replacen("ak_", "ok_", 1))
    }

    /// The identity as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OracleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OracleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Backend identifier of one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Wrap a query identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Handle to an oracle registration on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Registered identity.
    pub oracle_id: OracleId,
}

impl Registration {
    /// Create a registration handle.
    pub fn new(oracle_id: OracleId) -> Self {
        Self { oracle_id }
    }
}

/// One query as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    /// Query identifier, used when submitting the response.
    pub id: QueryId,
    /// Transport-encoded query payload.
    pub payload: Bytes,
    /// Response already recorded for this query, if any.
    pub response: Option<Bytes>,
}

impl PendingQuery {
    /// Create an unanswered query.
    pub fn new(id: impl Into<QueryId>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            response: None,
        }
    }

    /// Returns true if the backend already holds a response.
    #[inline]
    pub fn is_answered(&self) -> bool {
        self.response.is_some()
    }
}

/// The external request/response channel consumed by the oracle.
///
/// Implementations own every network concern, including timeouts. Each call
/// must either return within a bounded time or fail explicitly.
#[async_trait]
pub trait OracleChannel: Send + Sync + 'static {
    /// Register `oracle` with the backend.
    async fn register(&self, oracle: &OracleId) -> Result<Registration>;

    /// Find an existing registration for `oracle`.
    ///
    /// Returns [`OracleError::NotRegistered`](crate::OracleError::NotRegistered)
    /// when none exists.
    async fn lookup_registration(&self, oracle: &OracleId) -> Result<Registration>;

    /// All queries addressed to `oracle`, oldest first.
    async fn fetch_pending(&self, oracle: &OracleId) -> Result<Vec<PendingQuery>>;

    /// Submit the answer for one query.
    async fn submit_response(&self, oracle: &OracleId, query: &QueryId, answer: &str)
        -> Result<()>;
}
