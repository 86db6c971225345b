use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::constants::settings::ROLLBACK_HORIZON;
use crate::core::chronology;
use crate::core::extract;
use crate::core::extract::ExtractError;
use crate::core::node::Node;
use crate::core::node::NodeError;
use crate::core::reorg;
use crate::core::reorg::Phase;
use crate::core::reorg::ReorgError;
use crate::core::store::BlockBatch;
use crate::core::store::Repository;
use crate::core::store::StoreError;
use crate::core::types::Block;
use crate::core::types::TipState;
use crate::monitor::CoreStatus;
use crate::monitor::MonitorMessage;

/// Initial retry delay after a failed node call.
const BACKOFF_BASE: tokio::time::Duration = tokio::time::Duration::from_millis(1_000);
/// Retry delays stop doubling here.
const BACKOFF_CAP: tokio::time::Duration = tokio::time::Duration::from_millis(60_000);

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Reorg(#[from] ReorgError),
}

impl IngestError {
    /// True for failures worth retrying on the next cycle.
    ///
    /// A malformed block or a reorg past the horizon halts ingestion
    /// instead - skipping either would break index continuity.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Node(_) | Self::Store(_) => true,
            Self::Extract(_) => false,
            Self::Reorg(e) => matches!(
                e,
                ReorgError::Node(_) | ReorgError::Store(_) | ReorgError::MissingHeader(_)
            ),
        }
    }
}

/// Single writer driving block ingestion for one chain.
///
/// Fetches candidate blocks from the node, routes them through
/// extraction, chronology validation and index assignment, and applies
/// them to the store one atomic unit at a time.
pub struct Ingestor<R> {
    node: Node,
    store: R,
    tip: TipState,
    phase: Phase,
    pub polling_interval: tokio::time::Duration,
    monitor_tx: mpsc::Sender<MonitorMessage>,
}

impl<R: Repository + Send> Ingestor<R> {
    pub async fn new(
        node: Node,
        store: R,
        monitor_tx: mpsc::Sender<MonitorMessage>,
    ) -> Result<Self, IngestError> {
        let tip = store.tip().await?;
        if tip.header.is_initial() {
            info!("starting from an empty chain");
        } else {
            info!(
                "resuming from block {} at height {}",
                tip.header.header_id,
                tip.height()
            );
        }
        Ok(Self {
            node,
            store,
            tip,
            phase: Phase::Extending,
            polling_interval: tokio::time::Duration::from_millis(5_000),
            monitor_tx,
        })
    }

    /// Current tip, as held in memory.
    pub fn tip(&self) -> &TipState {
        &self.tip
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Consumes the ingestor, handing the store back.
    pub fn into_store(self) -> R {
        self.store
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!("entering {phase} phase");
        self.phase = phase;
    }

    /// Watch the node for new blocks.
    ///
    /// Syncs to the node's height and keeps polling. Returns on ctrl-c,
    /// checked between block applications only, or on a fatal error.
    pub async fn start(&mut self) -> Result<(), IngestError> {
        self.ensure_main_chain().await?;
        loop {
            let block = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("got a ctrl-c message - stopping ingestion");
                    return Ok(());
                },
                res = self.wait_for_next_block() => res?,
            };
            if let Err(e) = self.process(block).await {
                if !e.is_transient() {
                    return Err(e);
                }
                tracing::error!("block apply failed, retrying next cycle - error was: {e}");
                tokio::time::sleep(self.polling_interval).await;
            }
        }
    }

    /// Syncs up to the node's current height, then returns.
    pub async fn sync(&mut self) -> Result<(), IngestError> {
        self.ensure_main_chain().await?;
        while let Some(block) = self.next_block().await? {
            self.process(block).await?;
        }
        Ok(())
    }

    /// Rolls back until the stored tip is on the node's main chain.
    ///
    /// A crash during a reorg can leave the store on an orphaned block.
    async fn ensure_main_chain(&mut self) -> Result<(), IngestError> {
        while self.tip.height() > 0 {
            let node_info = self.node.api.info().await?;
            if node_info.full_height < self.tip.height() {
                tracing::warn!(
                    "node height {} is behind store height {} - waiting",
                    node_info.full_height,
                    self.tip.height()
                );
                tokio::time::sleep(self.polling_interval).await;
                continue;
            }
            let ids = self.node.api.blocks_at(self.tip.height()).await?;
            if ids.first() == Some(&self.tip.header.header_id) {
                break;
            }
            tracing::warn!(
                "stored tip {} at height {} is not on the main chain anymore - rolling back",
                self.tip.header.header_id,
                self.tip.height()
            );
            self.roll_back_tip().await?;
        }
        Ok(())
    }

    /// Routes a candidate block through extension or fork handling.
    ///
    /// Candidate blocks always sit one above the tip, so a parent id
    /// match is all it takes to classify them.
    async fn process(&mut self, block: Block) -> Result<(), IngestError> {
        if block.header.parent_id == self.tip.header.header_id {
            self.set_phase(Phase::Extending);
            self.include_block(block).await
        } else {
            self.handle_fork(block).await
        }
    }

    /// Validates, assigns and persists one block extending the tip.
    async fn include_block(&mut self, block: Block) -> Result<(), IngestError> {
        info!(
            "including block {} for height {}",
            block.header.header_id, block.header.height
        );
        let decision = chronology::validate(&block.header, &self.tip);
        if let Some(flag) = decision.flag(&block.header) {
            tracing::warn!(
                "block {} timestamp {} predates already indexed timestamp {} - keeping height order",
                flag.header_id,
                flag.violating_timestamp,
                flag.reference_timestamp
            );
            self.send_monitor(MonitorMessage::ChronologyViolation(flag))
                .await;
        }
        let batch = BlockBatch::build(&block, &self.tip);
        self.store.include_block(&batch).await?;
        self.tip = batch.tip();
        self.send_monitor(MonitorMessage::CoreUpdate(CoreStatus {
            height: self.tip.height(),
            last_global_index: self.tip.last_global_index,
        }))
        .await;
        Ok(())
    }

    /// Unwinds to the fork point, then replays the competing branch.
    async fn handle_fork(&mut self, candidate: Block) -> Result<(), IngestError> {
        self.set_phase(Phase::ForkDetected);
        tracing::warn!(
            "block {} for height {} does not extend the current tip - resolving fork",
            candidate.header.header_id,
            candidate.header.height
        );
        let plan = reorg::resolve(
            &candidate.header,
            &self.node,
            &mut self.store,
            self.tip.height(),
            ROLLBACK_HORIZON,
        )
        .await?;
        info!(
            "unwinding {} block(s) to fork point at height {}",
            plan.depth(self.tip.height()),
            plan.ancestor.height
        );

        self.set_phase(Phase::Unwinding);
        while self.tip.height() > plan.ancestor.height {
            self.roll_back_tip().await?;
        }

        self.set_phase(Phase::Replaying);
        for header in chronology::order_pending(plan.branch) {
            let block = if header.header_id == candidate.header.header_id {
                candidate.clone()
            } else {
                let raw = self.node.api.block_raw(&header.header_id).await?;
                extract::extract_block(&raw)?
            };
            self.include_block(block).await?;
        }
        self.set_phase(Phase::Extending);
        Ok(())
    }

    /// Marks the tip block off-chain and rewinds the cursor.
    async fn roll_back_tip(&mut self) -> Result<(), IngestError> {
        let height = self.tip.height();
        info!(
            "rolling back block {} at height {}",
            self.tip.header.header_id, height
        );
        self.tip = self.store.roll_back(height).await?;
        self.send_monitor(MonitorMessage::Rollback(height)).await;
        Ok(())
    }

    /// Returns the extracted block for the next height, if any.
    async fn next_block(&self) -> Result<Option<Block>, IngestError> {
        let ids = self.node.api.blocks_at(self.tip.height() + 1).await?;
        let header_id = match ids.first() {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        let raw = self.node.api.block_raw(&header_id).await?;
        Ok(Some(extract::extract_block(&raw)?))
    }

    /// Returns the next block, once available.
    ///
    /// Node failures are retried with exponential backoff and do not
    /// surface here. Anything else does.
    async fn wait_for_next_block(&self) -> Result<Block, IngestError> {
        let mut backoff = BACKOFF_BASE;
        loop {
            match self.next_block().await {
                Ok(Some(block)) => return Ok(block),
                Ok(None) => {
                    tokio::time::sleep(self.polling_interval).await;
                    backoff = BACKOFF_BASE;
                }
                Err(IngestError::Node(e)) => {
                    tracing::warn!("{e}");
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, BACKOFF_CAP);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_monitor(&self, msg: MonitorMessage) {
        if let Err(e) = self.monitor_tx.send(msg).await {
            tracing::warn!("monitor channel send failed - Error was: {e}");
        }
    }
}
