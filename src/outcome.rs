//! Per-item processing outcomes.
//!
//! Every query the oracle looks at produces an [`ItemOutcome`]. Outcomes are
//! collected into a [`PollReport`] per iteration and, when configured,
//! forwarded to an outcome channel for dead-letter handling or metrics.

use crate::channel::QueryId;

/// Why a query was passed over without an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The payload could not be decoded into text.
    Decode(String),
    /// The text did not parse into a request.
    Parse(String),
    /// No handler matched, or the handler returned an error.
    Dispatch(String),
    /// The backend already holds a response for this query.
    AlreadyAnswered,
}

/// Result of processing one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Answer submitted; the cursor moved past the item.
    Answered(String),
    /// Item dropped; the cursor moved past it.
    Skipped(SkipReason),
    /// Submission failed; the item is retried on the next iteration.
    Deferred(String),
}

impl ItemStatus {
    /// Returns true if the cursor moves past the item.
    #[inline]
    pub fn advances_cursor(&self) -> bool {
        !matches!(self, ItemStatus::Deferred(_))
    }
}

/// Outcome of one query within one polling iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Backend query identifier.
    pub query_id: QueryId,
    /// Index of the item in the fetched list.
    pub position: usize,
    /// What happened.
    pub status: ItemStatus,
}

/// Summary of one polling iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Number of items the backend returned.
    pub fetched: usize,
    /// Outcomes of the items processed, in order.
    pub outcomes: Vec<ItemOutcome>,
    /// Cursor after the iteration.
    pub cursor: usize,
}

impl PollReport {
    /// Number of answered items.
    pub fn answered(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Answered(_)))
    }

    /// Number of skipped items.
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped(_)))
    }

    /// Number of deferred items.
    pub fn deferred(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Deferred(_)))
    }

    fn count(&self, f: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}
