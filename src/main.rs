use std::env;
use tokio;

use gidx::config::PostgresConfig;
use gidx::core::store::PgStore;
use gidx::core::tracking::Ingestor;
use gidx::core::Node;
use gidx::monitor::Monitor;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), &'static str> {
    // Configure tracing subscriber
    let filter = env::var("GIDX_LOG").unwrap_or(String::from("gidx=info"));
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(filter)
        .finish();

    let _guard = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("starting gidx v{VERSION}");
    if cfg!(feature = "test-utilities") {
        tracing::warn!("build includes test-utilities, use cargo's `--no-default-features` flag");
    } else {
        tracing::debug!("compiled without test-utilities");
    }

    // Env variables
    let pgconf = PostgresConfig::from_env().map_err(|_| "GIDX_POSTGRES_URI is not set")?;

    let node_url = env::var("GIDX_NODE_URL").map_err(|_| "GIDX_NODE_URL is not set")?;
    tracing::debug!("found GIDX_NODE_URL environment variable");

    let mut monitor = Monitor::new();

    tracing::info!("configuring store");
    let node = Node::new("local-node", &node_url);
    let store = match PgStore::new(&pgconf).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("{e}");
            return Err("failed initializing store");
        }
    };

    let mut ingestor = match Ingestor::new(node, store, monitor.sender()).await {
        Ok(ingestor) => ingestor,
        Err(e) => {
            tracing::error!("{e}");
            return Err("failed configuring ingestor");
        }
    };

    // Start monitor
    tokio::spawn(async move {
        monitor.start().await;
    });

    // Ingest until ctrl-c or a fatal error
    if let Err(e) = ingestor.start().await {
        tracing::error!("ingestion halted: {e}");
        return Err("ingestion halted");
    }
    tracing::info!("exiting");
    Ok(())
}
