use axum::extract::Path;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::blocks::TestBlock;

type HeaderID = String;
type BlockIndex = usize;

async fn wait_some() {
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
}

/// A mock node API listening on localhost.
///
/// Takes a collection of block id specs (see `TestBlock`). Specs ending
/// with `*` are known to the node but off its main chain.
pub struct TestNode {
    address: Option<SocketAddr>,
    url: String,
    term_tx: Option<oneshot::Sender<()>>,
}

impl TestNode {
    /// Create a new node on a free port and start the api server.
    pub async fn run(block_ids: &[&str]) -> Self {
        let mut n = Self {
            address: None,
            url: String::new(),
            term_tx: None,
        };
        n.serve(block_ids).await;
        // Give some time to server to start up
        wait_some().await;
        n
    }

    /// Return the node's api url
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Restart the api server with a new chain.
    ///
    /// Keeps the address, so clients configured against this node see a
    /// node-side reorg.
    #[allow(dead_code)]
    pub async fn restart(&mut self, block_ids: &[&str]) {
        tracing::info!("Stopping server");
        match self.term_tx.take() {
            Some(tx) => tx.send(()).unwrap(),
            None => {
                panic!("Mock node server already stopped");
            }
        }
        wait_some().await;
        self.serve(block_ids).await;
        wait_some().await;
    }

    async fn serve(&mut self, block_ids: &[&str]) {
        if self.term_tx.is_some() {
            panic!("Can't start a TestNode that's already running");
        }
        let data = APIData::new(block_ids);
        let shared_state = Arc::new(data);

        let app = Router::new()
            .route("/", get(|| async { "Hello, World!" }))
            .route("/info", get(info))
            .route("/blocks/at/:height", get(blocks_at))
            .route("/blocks/:header_id", get(blocks))
            .route("/blocks/:header_id/header", get(blocks_header))
            .with_state(shared_state);

        // First run binds a free port, restarts reuse it.
        let address = self
            .address
            .unwrap_or_else(|| "127.0.0.1:0".parse().unwrap());
        let server = axum::Server::bind(&address).serve(app.into_make_service());
        self.address = Some(server.local_addr());
        self.url = format!("http://{}", server.local_addr());

        let (tx, rx) = oneshot::channel();
        self.term_tx = Some(tx);
        tokio::spawn(async move {
            tokio::select! {
                _ = server => {},
                _ = rx => {tracing::info!("Stopped server")},
            }
        });
    }
}

/// A mock node's preprocessed test data.
struct APIData {
    /// Collection of blocks known to the mock node
    blocks: Vec<TestBlock>,
    /// Main chain flag of each block, ordered as in `blocks`
    main_chain: Vec<bool>,
    /// Maps header ID's to an index into blocks
    lookup: HashMap<HeaderID, BlockIndex>,
}

impl APIData {
    fn new(block_ids: &[&str]) -> Self {
        let blocks: Vec<TestBlock> = block_ids.iter().map(|id| TestBlock::from_id(id)).collect();
        let main_chain: Vec<bool> = block_ids.iter().map(|id| !id.ends_with('*')).collect();

        let lookup: HashMap<HeaderID, BlockIndex> =
            blocks
                .iter()
                .enumerate()
                .fold(HashMap::new(), |mut acc, (i, b)| {
                    // Make sure we don't mask any blocks here.
                    // Insert returns None for new values.
                    assert_eq!(acc.insert(b.header_id(), i), None);
                    acc
                });

        Self {
            blocks,
            main_chain,
            lookup,
        }
    }

    fn best(&self) -> &TestBlock {
        self.blocks
            .iter()
            .zip(&self.main_chain)
            .filter(|(_b, main)| **main)
            .map(|(b, _main)| b)
            .max_by_key(|b| b.height())
            .expect("at least one main chain block")
    }
}

/// Mock of `/info` node endpoint
async fn info(State(state): State<Arc<APIData>>) -> Json<Value> {
    let best = state.best();
    Json(json!({
        "fullHeight": best.height(),
        "bestHeaderId": best.header_id(),
    }))
}

/// Mock of `/blocks/at/<height>` node endpoint
///
/// Retruns collection of header ids known for given `height`,
/// main chain first.
async fn blocks_at(Path(height): Path<i32>, State(state): State<Arc<APIData>>) -> Json<Value> {
    let mut header_ids: Vec<(bool, HeaderID)> = state
        .blocks
        .iter()
        .zip(&state.main_chain)
        .filter(|(b, _main)| b.height() == height)
        .map(|(b, main)| (!main, b.header_id()))
        .collect();
    header_ids.sort();
    let header_ids: Vec<HeaderID> = header_ids.into_iter().map(|(_off, id)| id).collect();
    Json(json!(header_ids))
}

/// Mock of `blocks/<header_id>`
///
/// Returns block data for given `header_id`
async fn blocks(Path(header_id): Path<String>, State(state): State<Arc<APIData>>) -> Json<Value> {
    let block_index = *state
        .lookup
        .get(&header_id)
        .unwrap_or_else(|| panic!("no such header in mock node lookup: {header_id}"));
    Json(state.blocks[block_index].to_json())
}

/// Mock of `blocks/<header_id>/header`
///
/// Returns header for given `header_id`
async fn blocks_header(
    Path(header_id): Path<String>,
    State(state): State<Arc<APIData>>,
) -> Json<Value> {
    let block_index = *state
        .lookup
        .get(&header_id)
        .expect("no such header in mock node lookup");
    Json(state.blocks[block_index].header_json())
}
