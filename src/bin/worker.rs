//! Worker process: drains the shared queue and executes jobs.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guildest_dispatch::config::Config;
use guildest_dispatch::handlers::{LlmReplyHandler, SafetyScanHandler};
use guildest_dispatch::llm::{CompletionClient, OpenAiCompatClient};
use guildest_dispatch::metrics::Metrics;
use guildest_dispatch::queue::{RedisStore, TaskQueue};
use guildest_dispatch::server::{self, AppState};
use guildest_dispatch::worker::{HandlerRegistry, Worker, WorkerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guildest_dispatch=info,guildest_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // An unreachable store is fatal here: a worker that cannot pop can
    // process nothing, so fail fast instead of retrying forever.
    let store = match RedisStore::connect(&config.redis_url).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(error = %err, url = %config.redis_url, "queue store is unreachable");
            std::process::exit(1);
        }
    };

    let queue = TaskQueue::new(store, &config.namespace);
    let metrics = Arc::new(Metrics::new().expect("metric registration cannot collide"));

    let registry = match &config.completion_api_key {
        Some(key) => {
            let client: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::new(key));
            HandlerRegistry::new()
                .register(LlmReplyHandler::new(client.clone()))
                .register(SafetyScanHandler::new(client))
        }
        None => {
            warn!("GROQ_API is not set; LLM-backed handlers are disabled");
            HandlerRegistry::new()
        }
    };

    let worker = Worker::new(queue, registry, WorkerConfig::default(), metrics.clone());
    if let Err(err) = worker.check_store().await {
        error!(error = %err, "queue store health check failed");
        std::process::exit(1);
    }

    let cancel = CancellationToken::new();

    let server_task = {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        let state = AppState::new(metrics);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = server::serve(addr, state, cancel).await {
                error!(error = %err, "observability server failed");
            }
        })
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }

    worker.run(cancel).await;

    if let Err(err) = server_task.await {
        warn!(error = %err, "observability server task failed to join");
    }
}
