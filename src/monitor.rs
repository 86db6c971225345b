use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::RwLock;
use tokio::sync::mpsc;

use crate::core::chronology::ChronologyViolationDetected;
use crate::core::types::GlobalIndex;
use crate::core::types::Height;

#[derive(Debug)]
pub struct CoreStatus {
    pub height: Height,
    pub last_global_index: GlobalIndex,
}

#[derive(Debug)]
pub enum MonitorMessage {
    /// A block was applied.
    CoreUpdate(CoreStatus),
    /// A block at given height was rolled back.
    Rollback(Height),
    /// A block's timestamp went back in time (see chronology module).
    ChronologyViolation(ChronologyViolationDetected),
}

#[derive(Default)]
struct MonitorData {
    /// Height of last processed block
    height: Height,
    /// Last issued global index
    last_global_index: GlobalIndex,
    /// Number of blocks rolled back since startup
    rollbacks: u64,
    /// Number of chronology violations since startup
    chronology_violations: u64,
}

type SharedState = Arc<RwLock<MonitorData>>;

pub struct Monitor {
    tx: mpsc::Sender<MonitorMessage>,
    rx: mpsc::Receiver<MonitorMessage>,
}

impl Monitor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(32);
        Self { tx, rx }
    }

    pub fn sender(&self) -> mpsc::Sender<MonitorMessage> {
        self.tx.clone()
    }

    pub async fn start(&mut self) {
        let state = SharedState::default();

        self.start_server(state.clone());

        loop {
            match self.rx.recv().await.expect("some message") {
                MonitorMessage::CoreUpdate(status) => {
                    let mut data = state.write().unwrap();
                    data.height = status.height;
                    data.last_global_index = status.last_global_index;
                }
                MonitorMessage::Rollback(_height) => {
                    state.write().unwrap().rollbacks += 1;
                }
                MonitorMessage::ChronologyViolation(_flag) => {
                    state.write().unwrap().chronology_violations += 1;
                }
            };
        }
    }

    fn start_server(&self, state: SharedState) {
        let app = Router::new()
            .route(
                "/",
                get(|| async { "Hey there, you're probably after /status" }),
            )
            .route("/status", get(status))
            .layer(Extension(state));

        let address = SocketAddr::from(([0, 0, 0, 0], 3005));
        tokio::spawn(async move {
            tracing::info!("listening on {}", &address);

            axum::Server::bind(&address)
                .serve(app.into_make_service())
                .await
                .unwrap()
        });
    }
}

async fn status(Extension(state): Extension<SharedState>) -> String {
    let data = &state.read().unwrap();

    format!(
        "height:                {}\nlast global index:     {}\nrollbacks:             {}\nchronology violations: {}",
        data.height, data.last_global_index, data.rollbacks, data.chronology_violations
    )
}
