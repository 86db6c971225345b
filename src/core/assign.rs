use super::types::Block;
use super::types::GlobalIndex;
use super::types::IndexedTransaction;

/// Assigns global indices to a block's transactions.
///
/// Indices are issued as `start, start + 1, ...` following the block's
/// final transaction order. Pure function of its inputs: identical
/// `(block, start)` always yield the identical assignment, so replays
/// from a checkpoint land on the same indices.
///
/// Returns the indexed transactions and the new last issued index.
/// An empty block leaves the cursor where it was, at `start - 1`.
pub fn assign(block: &Block, start: GlobalIndex) -> (Vec<IndexedTransaction>, GlobalIndex) {
    let indexed: Vec<IndexedTransaction> = block
        .transactions
        .iter()
        .zip(start..)
        .map(|(tx, global_index)| IndexedTransaction {
            id: tx.id.clone(),
            global_index,
            height: block.header.height,
            timestamp: block.header.timestamp,
            size: tx.size,
            index: tx.index,
        })
        .collect();
    let new_last = start + indexed.len() as GlobalIndex - 1;
    (indexed, new_last)
}
