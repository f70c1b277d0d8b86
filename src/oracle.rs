//! Oracle builder and polling loop.
//!
//! The [`OracleBuilder`] wires a channel, a handler, a query parser and a
//! payload codec together. The [`Oracle`] then drives the lifecycle:
//! 1. Register with the backend (reusing an existing registration)
//! 2. Fetch all queries addressed to the oracle
//! 3. Decode, parse and dispatch every item past the cursor
//! 4. Submit answers and advance the cursor
//! 5. Wait for the poll interval and repeat until cancelled
//!
//! # Example
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
//!     let oracle = Oracle::builder("ok_demo", channel.clone())
//!         .handler(mux)
//!         .build()
//!         .spawn();
//!
//!     // ... later
//!     oracle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::{OracleChannel, OracleId, PendingQuery, Registration};
use crate::codec::{PayloadCodec, RawCodec};
use crate::config::OracleConfig;
use crate::error::{OracleError, Result};
use crate::handler::{default_mux, Handler};
use crate::outcome::{ItemOutcome, ItemStatus, PollReport, SkipReason};
use crate::query::{DefaultQueryParser, QueryParser};

/// Lifecycle state of an [`Oracle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleState {
    /// No registration known yet.
    Unregistered,
    /// Registration in progress.
    Registering,
    /// Waiting for or fetching the next batch.
    Polling,
    /// Working through a fetched batch.
    Processing,
}

/// Builder for configuring and creating an [`Oracle`].
///
/// Anything not set falls back to the defaults: the process-wide
/// [`default_mux`], the [`DefaultQueryParser`] grammar and the [`RawCodec`].
pub struct OracleBuilder {
    oracle_id: OracleId,
    channel: Arc<dyn OracleChannel>,
    handler: Option<Arc<dyn Handler>>,
    parser: Option<Arc<dyn QueryParser>>,
    codec: Arc<dyn PayloadCodec>,
    config: OracleConfig,
    outcomes: Option<mpsc::Sender<ItemOutcome>>,
    cancel: Option<CancellationToken>,
}

impl OracleBuilder {
    /// Create a builder for `oracle_id` talking to `channel`.
    pub fn new(oracle_id: impl Into<OracleId>, channel: Arc<dyn OracleChannel>) -> Self {
        Self {
            oracle_id: oracle_id.into(),
            channel,
            handler: None,
            parser: None,
            codec: Arc::new(RawCodec),
            config: OracleConfig::default(),
            outcomes: None,
            cancel: None,
        }
    }

    /// Set the handler that answers requests.
    ///
    /// Usually a [`QueryMux`](crate::QueryMux), but any [`Handler`] works.
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set a handler that is shared with other code, such as a mux that
    /// keeps receiving registrations while the oracle runs.
    pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Replace the query grammar.
    pub fn query_parser<P: QueryParser>(mut self, parser: P) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Set the codec used to decode query payloads.
    pub fn codec<C: PayloadCodec>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: OracleConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the delay between polling iterations.
    ///
    /// Default: 1 second
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Skip queries that already have a response.
    ///
    /// Default: true
    pub fn skip_answered(mut self, skip: bool) -> Self {
        self.config.skip_answered = skip;
        self
    }

    /// Forward every [`ItemOutcome`] to `sender`.
    ///
    /// Sends never block the loop; outcomes are dropped with a warning while
    /// the channel is full.
    pub fn outcomes(mut self, sender: mpsc::Sender<ItemOutcome>) -> Self {
        self.outcomes = Some(sender);
        self
    }

    /// Use an existing cancellation token instead of a fresh one.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the oracle. Nothing touches the channel until it runs.
    pub fn build(self) -> Oracle {
        Oracle {
            oracle_id: self.oracle_id,
            channel: self.channel,
            handler: self
                .handler
                .unwrap_or_else(|| default_mux() as Arc<dyn Handler>),
            parser: self
                .parser
                .unwrap_or_else(|| Arc::new(DefaultQueryParser) as Arc<dyn QueryParser>),
            codec: self.codec,
            config: self.config,
            outcomes: self.outcomes,
            cancel: self.cancel.unwrap_or_default(),
            registration: None,
            cursor: 0,
            state: OracleState::Unregistered,
        }
    }
}

/// An oracle answering queries from an [`OracleChannel`].
pub struct Oracle {
    oracle_id: OracleId,
    channel: Arc<dyn OracleChannel>,
    handler: Arc<dyn Handler>,
    parser: Arc<dyn QueryParser>,
    codec: Arc<dyn PayloadCodec>,
    config: OracleConfig,
    outcomes: Option<mpsc::Sender<ItemOutcome>>,
    cancel: CancellationToken,
    registration: Option<Registration>,
    /// Number of fetched items already handled this session.
    cursor: usize,
    state: OracleState,
}

impl Oracle {
    /// Create a new oracle builder.
    pub fn builder(
        oracle_id: impl Into<OracleId>,
        channel: Arc<dyn OracleChannel>,
    ) -> OracleBuilder {
        OracleBuilder::new(oracle_id, channel)
    }

    /// The oracle's public identity.
    #[inline]
    pub fn oracle_id(&self) -> &OracleId {
        &self.oracle_id
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> OracleState {
        self.state
    }

    /// Number of fetched items already handled.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The active registration, once known.
    #[inline]
    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Token that stops [`Oracle::serve`] when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register with the backend.
    ///
    /// An existing registration for this identity is reused; otherwise a new
    /// one is created and read back.
    pub async fn register(&mut self) -> Result<&Registration> {
        self.state = OracleState::Registering;

        let registration = match self.channel.lookup_registration(&self.oracle_id).await {
            Ok(existing) => {
                tracing::debug!("reusing registration for {}", self.oracle_id);
                existing
            }
            Err(lookup_err) => {
                tracing::debug!("no registration for {}: {}", self.oracle_id, lookup_err);
                match self.register_new().await {
                    Ok(created) => created,
                    Err(e) => {
                        self.state = OracleState::Unregistered;
                        return Err(e);
                    }
                }
            }
        };

        tracing::info!("oracle {} registered", self.oracle_id);
        self.state = OracleState::Polling;
        let stored: &Registration = self.registration.insert(registration);
        Ok(stored)
    }

    async fn register_new(&self) -> Result<Registration> {
        let created = self.channel.register(&self.oracle_id).await?;

        // Prefer the backend's view of the registration when it is readable.
        match self.channel.lookup_registration(&self.oracle_id).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                tracing::debug!("registration for {} not readable yet: {}", self.oracle_id, e);
                Ok(created)
            }
        }
    }

    /// Run one polling iteration.
    ///
    /// Fetches all queries, then processes every item past the cursor in
    /// order. Per-item failures end up in the report; only a failed fetch
    /// is returned as an error.
    pub async fn poll_once(&mut self) -> Result<PollReport> {
        let items = self.channel.fetch_pending(&self.oracle_id).await?;

        if self.cursor > items.len() {
            // The backend dropped items we had already handled (expiry).
            // Start over; answered items are recognised by their response.
            tracing::warn!(
                "oracle {}: cursor {} beyond {} fetched items, rewinding",
                self.oracle_id,
                self.cursor,
                items.len()
            );
            self.cursor = 0;
        }

        if items.len() > self.cursor {
            tracing::debug!(
                "oracle {}: {} new queries",
                self.oracle_id,
                items.len() - self.cursor
            );
        }

        self.state = OracleState::Processing;
        let mut report = PollReport {
            fetched: items.len(),
            ..PollReport::default()
        };

        for (position, item) in items.iter().enumerate().skip(self.cursor) {
            if self.cancel.is_cancelled() {
                tracing::debug!("oracle {}: cancelled mid-batch", self.oracle_id);
                break;
            }

            let status = self.process_item(item).await;
            let advance = status.advances_cursor();

            let outcome = ItemOutcome {
                query_id: item.id.clone(),
                position,
                status,
            };
            self.emit(&outcome);
            report.outcomes.push(outcome);

            if !advance {
                // Keep submission order: later items wait for this one.
                break;
            }
            self.cursor = position + 1;
        }

        self.state = OracleState::Polling;
        report.cursor = self.cursor;
        Ok(report)
    }

    /// Decode, parse, dispatch and answer a single query.
    async fn process_item(&self, item: &PendingQuery) -> ItemStatus {
        if self.config.skip_answered && item.is_answered() {
            tracing::debug!("query {} already answered, skipping", item.id);
            return ItemStatus::Skipped(SkipReason::AlreadyAnswered);
        }

        let text = match self.codec.decode(&item.payload) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("query {}: decode failed: {}", item.id, e);
                return ItemStatus::Skipped(SkipReason::Decode(e.to_string()));
            }
        };
        tracing::debug!("received query {}: {}", item.id, text);

        let request = match self.parser.parse(&text) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("query {}: parse failed: {}", item.id, e);
                return ItemStatus::Skipped(SkipReason::Parse(e.to_string()));
            }
        };

        let answer = match self.handler.answer(request).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!("query {}: handler failed: {}", item.id, e);
                return ItemStatus::Skipped(SkipReason::Dispatch(e.to_string()));
            }
        };

        match self
            .channel
            .submit_response(&self.oracle_id, &item.id, &answer)
            .await
        {
            Ok(()) => {
                tracing::debug!("answered query {}", item.id);
                ItemStatus::Answered(answer)
            }
            Err(e) => {
                tracing::error!("query {}: submit failed: {}", item.id, e);
                ItemStatus::Deferred(e.to_string())
            }
        }
    }

    fn emit(&self, outcome: &ItemOutcome) {
        let Some(tx) = &self.outcomes else {
            return;
        };

        match tx.try_send(outcome.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("outcome channel full, dropping outcome for {}", outcome.query_id);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Poll until the cancellation token fires.
    ///
    /// Registration and fetch failures are logged and retried after the
    /// poll interval. Returns once cancelled.
    pub async fn serve(&mut self) -> Result<()> {
        tracing::info!(
            "oracle {} serving, poll interval {:?}",
            self.oracle_id,
            self.config.poll_interval()
        );

        while !self.cancel.is_cancelled() {
            if self.registration.is_none() {
                let registered = self.register().await.map(|_| ());
                if let Err(e) = registered {
                    tracing::warn!("oracle {}: registration failed: {}", self.oracle_id, e);
                    if !self.pause().await {
                        break;
                    }
                    continue;
                }
            }

            match self.poll_once().await {
                Ok(report) => {
                    if !report.outcomes.is_empty() {
                        tracing::debug!(
                            "oracle {}: answered {}, skipped {}, deferred {}, cursor {}",
                            self.oracle_id,
                            report.answered(),
                            report.skipped(),
                            report.deferred(),
                            report.cursor
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("oracle {}: fetch failed: {}", self.oracle_id, e);
                }
            }

            if !self.pause().await {
                break;
            }
        }

        tracing::info!("oracle {} stopped", self.oracle_id);
        Ok(())
    }

    /// Wait for the poll interval. Returns false if cancelled meanwhile.
    async fn pause(&self) -> bool {
        let interval = self.config.poll_interval();
        if interval.is_zero() {
            tokio::task::yield_now().await;
            return !self.cancel.is_cancelled();
        }

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }

    /// Run [`Oracle::serve`] on a background task.
    pub fn spawn(mut self) -> OracleHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move { self.serve().await });
        OracleHandle { cancel, task }
    }
}

/// Handle to an oracle running on a background task.
pub struct OracleHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl OracleHandle {
    /// Token that stops the oracle when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns true once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the oracle and wait for the loop to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await.map_err(OracleError::from)?
    }
}
