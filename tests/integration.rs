//! Integration tests for oraclewire.
//!
//! These tests drive the public API end to end against scripted channels.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use oraclewire::channel::{InMemoryChannel, PendingQuery, Registration};
use oraclewire::codec::{MsgPackCodec, PayloadCodec, PrefixedBase64Codec};
use oraclewire::query::ParserFn;
use oraclewire::{
    ItemStatus, Oracle, OracleChannel, OracleError, OracleId, QueryId, QueryMux, Request,
    Result, SkipReason,
};
use tokio::sync::mpsc;

/// Backend with a fixed query list and injectable failures.
#[derive(Default)]
struct Script {
    registered: bool,
    register_calls: usize,
    items: Vec<PendingQuery>,
    submitted: Vec<(QueryId, String)>,
    failing_fetches: usize,
    failing_submits: usize,
}

#[derive(Default)]
struct ScriptedChannel {
    script: Mutex<Script>,
}

impl ScriptedChannel {
    fn with_items(items: Vec<PendingQuery>) -> Arc<Self> {
        let channel = Self::default();
        {
            let mut script = channel.script.lock().unwrap();
            script.registered = true;
            script.items = items;
        }
        Arc::new(channel)
    }

    fn submitted(&self) -> Vec<(QueryId, String)> {
        self.script.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl OracleChannel for ScriptedChannel {
    async fn register(&self, oracle: &OracleId) -> Result<Registration> {
        let mut script = self.script.lock().unwrap();
        script.register_calls += 1;
        script.registered = true;
        Ok(Registration::new(oracle.clone()))
    }

    async fn lookup_registration(&self, oracle: &OracleId) -> Result<Registration> {
        if self.script.lock().unwrap().registered {
            Ok(Registration::new(oracle.clone()))
        } else {
            Err(OracleError::NotRegistered(oracle.to_string()))
        }
    }

    async fn fetch_pending(&self, _oracle: &OracleId) -> Result<Vec<PendingQuery>> {
        let mut script = self.script.lock().unwrap();
        if script.failing_fetches > 0 {
            script.failing_fetches -= 1;
            return Err(OracleError::Channel("node unavailable".to_string()));
        }
        Ok(script.items.clone())
    }

    async fn submit_response(
        &self,
        _oracle: &OracleId,
        query: &QueryId,
        answer: &str,
    ) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        if script.failing_submits > 0 {
            script.failing_submits -= 1;
            return Err(OracleError::Channel("broadcast failed".to_string()));
        }
        script.submitted.push((query.clone(), answer.to_string()));
        Ok(())
    }
}

fn hello_mux() -> QueryMux {
    let mux = QueryMux::new();
    mux.handle_func("hello", |req: Request| async move {
        let name = req.arg("name").unwrap_or_else(|| "stranger".to_string());
        if name.to_lowercase().contains("vitalik") {
            return Err(OracleError::Rejected("Go away!".to_string()));
        }
        Ok(format!("Hello, {}", name))
    })
    .unwrap();
    mux
}

/// Register a hello handler, receive one query, answer it.
#[tokio::test]
async fn test_hello_end_to_end() {
    let channel = ScriptedChannel::with_items(vec![PendingQuery::new("oq_1", "hello:name=Ada")]);
    let mut oracle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .build();

    let before = oracle.cursor();
    let report = oracle.poll_once().await.unwrap();

    assert_eq!(oracle.cursor(), before + 1);
    assert_eq!(report.answered(), 1);
    assert_eq!(
        channel.submitted(),
        vec![(QueryId::new("oq_1"), "Hello, Ada".to_string())]
    );
}

/// An undecodable item in the middle of a batch does not stop the others.
#[tokio::test]
async fn test_fault_isolation_on_decode_failure() {
    let channel = ScriptedChannel::with_items(vec![
        PendingQuery::new("oq_1", "hello:name=One"),
        PendingQuery::new("oq_2", Bytes::from_static(&[0xff, 0xfe, 0xfd])),
        PendingQuery::new("oq_3", "hello:name=Three"),
    ]);
    let mut oracle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .build();

    let report = oracle.poll_once().await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(matches!(
        report.outcomes[1].status,
        ItemStatus::Skipped(SkipReason::Decode(_))
    ));
    assert_eq!(oracle.cursor(), 3);
    assert_eq!(
        channel.submitted(),
        vec![
            (QueryId::new("oq_1"), "Hello, One".to_string()),
            (QueryId::new("oq_3"), "Hello, Three".to_string()),
        ]
    );
}

/// Handler rejections are per-item and reported as outcomes.
#[tokio::test]
async fn test_handler_rejection_is_skipped() {
    let channel = ScriptedChannel::with_items(vec![
        PendingQuery::new("oq_1", "hello:name=Vitalik"),
        PendingQuery::new("oq_2", "hello"),
    ]);
    let (tx, mut rx) = mpsc::channel(8);
    let mut oracle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .outcomes(tx)
        .build();

    oracle.poll_once().await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.query_id, QueryId::new("oq_1"));
    assert!(matches!(
        first.status,
        ItemStatus::Skipped(SkipReason::Dispatch(ref m)) if m.contains("Go away!")
    ));

    let second = rx.recv().await.unwrap();
    assert_eq!(second.status, ItemStatus::Answered("Hello, stranger".to_string()));
}

/// A failed submission keeps the cursor on the item and retries it first.
#[tokio::test]
async fn test_submit_failure_retried_in_order() {
    let channel = ScriptedChannel::with_items(vec![
        PendingQuery::new("oq_1", "hello:name=First"),
        PendingQuery::new("oq_2", "hello:name=Second"),
    ]);
    channel.script.lock().unwrap().failing_submits = 1;

    let mut oracle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .build();

    let report = oracle.poll_once().await.unwrap();
    assert_eq!(report.deferred(), 1);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(oracle.cursor(), 0);
    assert!(channel.submitted().is_empty());

    let report = oracle.poll_once().await.unwrap();
    assert_eq!(report.answered(), 2);
    assert_eq!(oracle.cursor(), 2);
    assert_eq!(
        channel.submitted(),
        vec![
            (QueryId::new("oq_1"), "Hello, First".to_string()),
            (QueryId::new("oq_2"), "Hello, Second".to_string()),
        ]
    );
}

/// Fetch failures are retried by the serving loop.
#[tokio::test]
async fn test_serve_survives_fetch_failures() {
    let channel = ScriptedChannel::with_items(vec![PendingQuery::new("oq_1", "hello:name=Ada")]);
    channel.script.lock().unwrap().failing_fetches = 3;

    let handle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .poll_interval(Duration::from_millis(1))
        .build()
        .spawn();

    for _ in 0..200 {
        if !channel.submitted().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!handle.is_finished());
    handle.shutdown().await.unwrap();
    assert_eq!(
        channel.submitted(),
        vec![(QueryId::new("oq_1"), "Hello, Ada".to_string())]
    );
}

/// An existing registration is reused instead of registering again.
#[tokio::test]
async fn test_existing_registration_reused() {
    let channel = ScriptedChannel::with_items(Vec::new());
    let mut oracle = Oracle::builder("ok_hello", channel.clone()).build();

    oracle.register().await.unwrap();
    assert_eq!(channel.script.lock().unwrap().register_calls, 0);
}

/// A missing registration is created once.
#[tokio::test]
async fn test_new_registration_created() {
    let channel = Arc::new(ScriptedChannel::default());
    let mut oracle = Oracle::builder("ok_new", channel.clone()).build();

    let reg = oracle.register().await.unwrap();
    assert_eq!(reg.oracle_id, OracleId::new("ok_new"));
    assert_eq!(channel.script.lock().unwrap().register_calls, 1);
}

/// Oracles without an explicit handler use the process-wide registry.
#[tokio::test]
async fn test_default_registry() {
    oraclewire::handle_func("integration_default", |_req: Request| async {
        Ok("from default".to_string())
    })
    .unwrap();

    let channel = ScriptedChannel::with_items(vec![PendingQuery::new("oq_1", "integration_default")]);
    let mut oracle = Oracle::builder("ok_default", channel.clone()).build();

    oracle.poll_once().await.unwrap();
    assert_eq!(
        channel.submitted(),
        vec![(QueryId::new("oq_1"), "from default".to_string())]
    );
}

/// Custom codec and custom query language.
#[tokio::test]
async fn test_custom_codec_and_parser() {
    let payload = MsgPackCodec.encode("sum 2 40").unwrap();
    let channel = ScriptedChannel::with_items(vec![PendingQuery::new("oq_1", payload)]);

    let mux = QueryMux::new();
    mux.handle_func("sum", |req: Request| async move {
        let a: i64 = req.arg_as("a")?;
        let b: i64 = req.arg_as("b")?;
        Ok::<_, OracleError>((a + b).to_string())
    })
    .unwrap();

    let parser = ParserFn(|raw: &str| {
        let mut words = raw.split_whitespace();
        let req = Request::new(words.next().unwrap_or_default());
        for (key, value) in ["a", "b"].into_iter().zip(words) {
            req.set_arg(key, value);
        }
        Ok::<_, OracleError>(req)
    });

    let mut oracle = Oracle::builder("ok_sum", channel.clone())
        .handler(mux)
        .query_parser(parser)
        .codec(MsgPackCodec)
        .build();

    oracle.poll_once().await.unwrap();
    assert_eq!(
        channel.submitted(),
        vec![(QueryId::new("oq_1"), "42".to_string())]
    );
}

/// Node-encoded payloads through the in-memory backend.
#[tokio::test]
async fn test_prefixed_payloads_in_memory() {
    let codec = PrefixedBase64Codec::queries();
    let channel = Arc::new(InMemoryChannel::new());
    let me = OracleId::from_account_address("ak_2FDtT4tP8PQdakf9QQL8XAKM");
    channel.register(&me).await.unwrap();

    let id = channel
        .post_query(&me, codec.encode("hello:name=Arjan van Eersel").unwrap())
        .unwrap();

    let mut oracle = Oracle::builder(me, channel.clone())
        .handler(hello_mux())
        .codec(codec)
        .build();
    oracle.poll_once().await.unwrap();

    assert_eq!(
        channel.response(&id).as_deref(),
        Some("Hello, Arjan van Eersel")
    );
}

/// Registering through a shared mux while the oracle runs.
#[tokio::test]
async fn test_registration_after_start() {
    let channel = ScriptedChannel::with_items(vec![PendingQuery::new("oq_1", "late")]);
    let mux = Arc::new(QueryMux::new());
    let mut oracle = Oracle::builder("ok_late", channel.clone())
        .shared_handler(mux.clone())
        .build();

    let report = oracle.poll_once().await.unwrap();
    assert_eq!(report.skipped(), 1);

    mux.handle_func("late", |_req: Request| async { Ok("now".to_string()) })
        .unwrap();
    channel
        .script
        .lock()
        .unwrap()
        .items
        .push(PendingQuery::new("oq_2", "late"));

    let report = oracle.poll_once().await.unwrap();
    assert_eq!(report.answered(), 1);
    assert_eq!(
        channel.submitted(),
        vec![(QueryId::new("oq_2"), "now".to_string())]
    );
}

/// The cursor rewinds when the backend drops old items.
#[tokio::test]
async fn test_cursor_rewinds_when_backend_shrinks() {
    let channel = ScriptedChannel::with_items(vec![
        PendingQuery::new("oq_1", "hello"),
        PendingQuery::new("oq_2", "hello"),
    ]);
    let mut oracle = Oracle::builder("ok_hello", channel.clone())
        .handler(hello_mux())
        .build();
    oracle.poll_once().await.unwrap();
    assert_eq!(oracle.cursor(), 2);

    {
        let mut script = channel.script.lock().unwrap();
        let mut answered = PendingQuery::new("oq_2", "hello");
        answered.response = Some(Bytes::from_static(b"Hello, stranger"));
        script.items = vec![answered];
    }

    let report = oracle.poll_once().await.unwrap();
    assert_eq!(
        report.outcomes[0].status,
        ItemStatus::Skipped(SkipReason::AlreadyAnswered)
    );
    assert_eq!(oracle.cursor(), 1);
    assert_eq!(channel.submitted().len(), 2);
}
