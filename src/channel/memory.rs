//! In-process oracle backend.
//!
//! # Example
//!
//! ```
//! use oraclewire::channel::{InMemoryChannel, OracleChannel, OracleId};
//!
//! # tokio_test_block(async {
//! let channel = InMemoryChannel::new();
//! let oracle = OracleId::new("ok_demo");
//!
//! channel.register(&oracle).await.unwrap();
//! let id = channel.post_query(&oracle, "hello:name=Ada").unwrap();
//!
//! let pending = channel.fetch_pending(&oracle).await.unwrap();
//! assert_eq!(pending.len(), 1);
//!
//! channel.submit_response(&oracle, &id, "Hello, Ada").await.unwrap();
//! assert_eq!(channel.response(&id).as_deref(), Some("Hello, Ada"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use super::{OracleChannel, OracleId, PendingQuery, QueryId, Registration};
use crate::error::{OracleError, Result};

#[derive(Default)]
struct State {
    /// Queries per registered oracle, oldest first.
    oracles: HashMap<OracleId, Vec<QueryId>>,
    /// Query payloads and responses by id.
    queries: HashMap<QueryId, PendingQuery>,
    /// Next query sequence number.
    next_query: u64,
}

/// Oracle backend kept entirely in memory.
///
/// Registration is idempotent. Queries can be posted only to registered
/// oracles. Answers are stored as UTF-8 bytes and never overwritten, so a
/// second submission for the same query is rejected.
#[derive(Default)]
pub struct InMemoryChannel {
    state: Mutex<State>,
}

impl InMemoryChannel {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post a query to `oracle`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::NotRegistered`] if the oracle is unknown.
    pub fn post_query(&self, oracle: &OracleId, payload: impl Into<Bytes>) -> Result<QueryId> {
        let mut state = self.lock();
        let State {
            oracles,
            queries,
            next_query,
        } = &mut *state;

        let list = oracles
            .get_mut(oracle)
            .ok_or_else(|| OracleError::NotRegistered(oracle.to_string()))?;

        *next_query += 1;
        let id = QueryId::new(format!("oq_{}", next_query));

        list.push(id.clone());
        queries.insert(id.clone(), PendingQuery::new(id.clone(), payload));

        tracing::debug!("posted query {} to {}", id, oracle);
        Ok(id)
    }

    /// The answer recorded for a query, if any.
    pub fn response(&self, query: &QueryId) -> Option<String> {
        let state = self.lock();
        state
            .queries
            .get(query)
            .and_then(|q| q.response.as_ref())
            .map(|r| String::from_utf8_lossy(r).into_owned())
    }

    /// Number of queries addressed to `oracle`.
    pub fn query_count(&self, oracle: &OracleId) -> usize {
        self.lock().oracles.get(oracle).map_or(0, Vec::len)
    }

    /// Returns true if `oracle` is registered.
    pub fn is_registered(&self, oracle: &OracleId) -> bool {
        self.lock().oracles.contains_key(oracle)
    }
}

#[async_trait]
impl OracleChannel for InMemoryChannel {
    async fn register(&self, oracle: &OracleId) -> Result<Registration> {
        self.lock().oracles.entry(oracle.clone()).or_default();
        Ok(Registration::new(oracle.clone()))
    }

    async fn lookup_registration(&self, oracle: &OracleId) -> Result<Registration> {
        if self.is_registered(oracle) {
            Ok(Registration::new(oracle.clone()))
        } else {
            Err(OracleError::NotRegistered(oracle.to_string()))
        }
    }

    async fn fetch_pending(&self, oracle: &OracleId) -> Result<Vec<PendingQuery>> {
        let state = self.lock();
        let ids = state
            .oracles
            .get(oracle)
            .ok_or_else(|| OracleError::NotRegistered(oracle.to_string()))?;

        Ok(ids
            .iter()
            .filter_map(|id| state.queries.get(id).cloned())
            .collect())
    }

    async fn submit_response(
        &self,
        oracle: &OracleId,
        query: &QueryId,
        answer: &str,
    ) -> Result<()> {
        let mut state = self.lock();
        let State {
            oracles, queries, ..
        } = &mut *state;

        let owned = oracles
            .get(oracle)
            .ok_or_else(|| OracleError::NotRegistered(oracle.to_string()))?;

        if !owned.contains(query) {
            return Err(OracleError::UnknownQueryId(query.to_string()));
        }

        let entry = queries
            .get_mut(query)
            .ok_or_else(|| OracleError::UnknownQueryId(query.to_string()))?;

        if entry.response.is_some() {
            return Err(OracleError::Channel(format!(
                "query {} already has a response",
                query
            )));
        }

        entry.response = Some(Bytes::copy_from_slice(answer.as_bytes()));
        Ok(())
    }
}
