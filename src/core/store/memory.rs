//! In-memory store, for tests and ephemeral runs.
//!
//! Mirrors the relational layout of the postgres store closely enough
//! to exercise the full ingestion pipeline without a database.

use async_trait::async_trait;

use super::BlockBatch;
use super::Repository;
use super::StoreError;
use crate::core::types::GlobalIndex;
use crate::core::types::Header;
use crate::core::types::HeaderID;
use crate::core::types::Height;
use crate::core::types::IndexedTransaction;
use crate::core::types::Timestamp;
use crate::core::types::TipState;

#[derive(Debug, Clone)]
struct HeaderRecord {
    header: Header,
    main_chain: bool,
    last_global_index: GlobalIndex,
    max_timestamp: Timestamp,
}

impl HeaderRecord {
    fn tip_state(&self) -> TipState {
        TipState {
            header: self.header.clone(),
            last_global_index: self.last_global_index,
            max_timestamp: self.max_timestamp,
        }
    }
}

#[derive(Debug, Clone)]
struct TransactionRecord {
    record: IndexedTransaction,
    header_id: HeaderID,
    main_chain: bool,
}

#[derive(Debug)]
pub struct MemStore {
    headers: Vec<HeaderRecord>,
    transactions: Vec<TransactionRecord>,
    cursor: GlobalIndex,
}

impl MemStore {
    pub fn new() -> Self {
        // Same pre-genesis placeholder as the sql schema.
        let initial = HeaderRecord {
            header: Header::initial(),
            main_chain: true,
            last_global_index: -1,
            max_timestamp: 0,
        };
        Self {
            headers: vec![initial],
            transactions: vec![],
            cursor: -1,
        }
    }

    fn tip_record(&self) -> &HeaderRecord {
        // The placeholder guarantees at least one main chain record.
        self.headers
            .iter()
            .filter(|r| r.main_chain)
            .max_by_key(|r| r.header.height)
            .expect("at least the initial header record")
    }

    /// Last issued global index.
    pub fn cursor(&self) -> GlobalIndex {
        self.cursor
    }

    /// Live transactions, ordered by global index.
    pub fn main_chain_transactions(&self) -> Vec<IndexedTransaction> {
        let mut txs: Vec<IndexedTransaction> = self
            .transactions
            .iter()
            .filter(|r| r.main_chain)
            .map(|r| r.record.clone())
            .collect();
        txs.sort_by_key(|tx| tx.global_index);
        txs
    }

    /// Reorged-out transactions, retained for audit.
    pub fn off_chain_transactions(&self) -> Vec<IndexedTransaction> {
        self.transactions
            .iter()
            .filter(|r| !r.main_chain)
            .map(|r| r.record.clone())
            .collect()
    }
}

#[async_trait]
impl Repository for MemStore {
    async fn tip(&self) -> Result<TipState, StoreError> {
        Ok(self.tip_record().tip_state())
    }

    async fn include_block(&mut self, batch: &BlockBatch) -> Result<(), StoreError> {
        let tip = self.tip_record();
        assert_eq!(batch.header.height, tip.header.height + 1);
        assert_eq!(batch.header.parent_id, tip.header.header_id);

        // A block unwound by an earlier reorg can get re-included.
        self.headers
            .retain(|r| r.header.header_id != batch.header.header_id);
        self.transactions
            .retain(|r| r.header_id != batch.header.header_id);

        self.headers.push(HeaderRecord {
            header: batch.header.clone(),
            main_chain: true,
            last_global_index: batch.last_global_index,
            max_timestamp: batch.max_timestamp,
        });
        for tx in &batch.transactions {
            self.transactions.push(TransactionRecord {
                record: tx.clone(),
                header_id: batch.header.header_id.clone(),
                main_chain: true,
            });
        }
        self.cursor = batch.last_global_index;
        Ok(())
    }

    async fn roll_back(&mut self, height: Height) -> Result<TipState, StoreError> {
        let tip = self.tip_record().clone();
        assert_eq!(tip.header.height, height);

        let parent = self
            .headers
            .iter()
            .find(|r| r.main_chain && r.header.header_id == tip.header.parent_id)
            .cloned()
            .ok_or_else(|| StoreError::MissingParent(tip.header.header_id.clone()))?;

        for r in self.headers.iter_mut() {
            if r.header.header_id == tip.header.header_id {
                r.main_chain = false;
            }
        }
        for r in self.transactions.iter_mut() {
            if r.header_id == tip.header.header_id {
                r.main_chain = false;
            }
        }
        self.cursor = parent.last_global_index;
        Ok(parent.tip_state())
    }

    async fn get_main_header(
        &mut self,
        header_id: &HeaderID,
    ) -> Result<Option<Header>, StoreError> {
        Ok(self
            .headers
            .iter()
            .find(|r| r.main_chain && &r.header.header_id == header_id)
            .map(|r| r.header.clone()))
    }
}
