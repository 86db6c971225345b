#[cfg(feature = "test-utilities")]
mod memory;
mod pg;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "test-utilities")]
pub use memory::MemStore;
pub use pg::PgStore;

use super::assign;
use super::types::Block;
use super::types::GlobalIndex;
use super::types::Header;
use super::types::HeaderID;
use super::types::Height;
use super::types::IndexedTransaction;
use super::types::Timestamp;
use super::types::TipState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("no parent record for header {0} - cannot roll back")]
    MissingParent(HeaderID),
}

/// A block's fully indexed data, applied to a store as one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockBatch {
    pub header: Header,
    pub transactions: Vec<IndexedTransaction>,
    /// Cursor value once this block is applied.
    pub last_global_index: GlobalIndex,
    /// Highest included transaction timestamp once this block is applied.
    pub max_timestamp: Timestamp,
}

impl BlockBatch {
    /// Builds the apply unit for `block` extending `tip`.
    ///
    /// This is the referentially transparent (state, block) -> state'
    /// transform at the heart of index assignment. The block's final
    /// transaction order is expected to be settled by now.
    pub fn build(block: &Block, tip: &TipState) -> Self {
        let (transactions, last_global_index) = assign::assign(block, tip.next_index());
        let max_timestamp = if transactions.is_empty() {
            // An empty block contributes no transaction timestamps.
            tip.max_timestamp
        } else {
            tip.max_timestamp.max(block.header.timestamp)
        };
        Self {
            header: block.header.clone(),
            transactions,
            last_global_index,
            max_timestamp,
        }
    }

    /// Tip state once this batch is applied.
    pub fn tip(&self) -> TipState {
        TipState {
            header: self.header.clone(),
            last_global_index: self.last_global_index,
            max_timestamp: self.max_timestamp,
        }
    }
}

/// Chain-state persistence contract.
///
/// A single writer owns the store; getters take `&mut self` to allow
/// implementations to keep caches.
#[async_trait]
pub trait Repository {
    /// Current best tip with cursor state.
    async fn tip(&self) -> Result<TipState, StoreError>;

    /// Applies a block's records and advances the cursor.
    ///
    /// One commit unit: either all of the block's transactions become
    /// visible and the cursor advances, or nothing does.
    async fn include_block(&mut self, batch: &BlockBatch) -> Result<(), StoreError>;

    /// Marks the tip block at `height` off-chain and rewinds the cursor
    /// to its parent. Off-chain records are kept for audit, their indices
    /// no longer count as issued. Returns the new tip state.
    async fn roll_back(&mut self, height: Height) -> Result<TipState, StoreError>;

    /// Returns the main-chain header with given id, if any.
    ///
    /// Fork point searches lean on this to tell main chain blocks from
    /// side chain ones.
    async fn get_main_header(
        &mut self,
        header_id: &HeaderID,
    ) -> Result<Option<Header>, StoreError>;
}
