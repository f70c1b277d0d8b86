//! Hello Oracle - register handlers and answer queries end to end.
//!
//! This example demonstrates:
//! - Registering a function handler and an object handler on a [`QueryMux`]
//! - Running an [`Oracle`] against the in-memory backend
//! - Collecting per-item outcomes, including rejected queries
//!
//! # Running
//!
//! ```text
//! RUST_LOG=oraclewire=debug cargo run --example hello_oracle
//! ```

use std::sync::Arc;
use std::time::Duration;

use oraclewire::channel::InMemoryChannel;
use oraclewire::handler::{BoxFuture, HandlerResult};
use oraclewire::{
    Handler, ItemStatus, Oracle, OracleChannel, OracleError, OracleId, QueryMux, Request,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Object handler answering with a fixed number.
struct ComplexObject {
    number: i64,
}

impl Handler for ComplexObject {
    fn answer(&self, _request: Request) -> BoxFuture<'static, HandlerResult> {
        let number = self.number;
        Box::pin(async move { Ok(format!("The number is: {}", number)) })
    }
}

/// Greets `name`, or "stranger" when the argument is absent.
async fn hello(req: Request) -> HandlerResult {
    let name = req.arg("name");

    if let Some(n) = &name {
        if n.to_lowercase().contains("vitalik") {
            return Err(OracleError::Rejected("Go away!".to_string()));
        }
    }

    Ok(format!("Hello, {}", name.as_deref().unwrap_or("stranger")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mux = QueryMux::new();
    mux.handle_func("hello", hello)?;
    mux.handle("complex", ComplexObject { number: 42 })?;

    let channel = Arc::new(InMemoryChannel::new());
    let me = OracleId::from_account_address("ak_2FDtT4tP8PQdakf9QQL8XAKM2eTfukTc6YUcmf54n22TCo2Uks");
    channel.register(&me).await?;

    let queries = [
        "hello:name=Arjan van Eersel",
        "hello",
        "hello:name=Vitalik",
        "complex",
        "unknown:x=1",
    ];
    let ids = queries
        .iter()
        .map(|q| channel.post_query(&me, *q))
        .collect::<Result<Vec<_>, _>>()?;

    let (tx, mut outcomes) = mpsc::channel(16);
    let oracle = Oracle::builder(me, channel.clone())
        .handler(mux)
        .poll_interval(Duration::from_millis(100))
        .outcomes(tx)
        .build()
        .spawn();

    for _ in 0..queries.len() {
        let Some(outcome) = outcomes.recv().await else {
            break;
        };
        match outcome.status {
            ItemStatus::Answered(answer) => {
                tracing::info!("{} -> {}", outcome.query_id, answer)
            }
            other => tracing::warn!("{} -> {:?}", outcome.query_id, other),
        }
    }

    oracle.shutdown().await?;

    for (query, id) in queries.iter().zip(&ids) {
        tracing::info!("{:<32} {:?}", query, channel.response(id));
    }

    Ok(())
}
