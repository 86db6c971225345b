use thiserror::Error;

use super::node;
use super::types::Block;
use super::types::Header;
use super::types::Transaction;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Block data could not be parsed into the expected structure.
    ///
    /// Fatal for ingestion. Skipping the block would leave a permanent
    /// gap in the index sequence, so the caller must halt instead.
    #[error("malformed block: {0}")]
    MalformedBlock(String),
}

/// Converts a raw block, as returned by the node API, into core types.
///
/// Pure function. Preserves the block's intrinsic transaction order and
/// makes no ordering decisions beyond that.
pub fn extract_block(raw: &str) -> Result<Block, ExtractError> {
    let node_block: node::models::Block =
        serde_json::from_str(raw).map_err(|e| ExtractError::MalformedBlock(e.to_string()))?;
    if node_block.header.id.is_empty() {
        return Err(ExtractError::MalformedBlock(String::from(
            "empty header id",
        )));
    }
    if node_block.header.height < 1 {
        return Err(ExtractError::MalformedBlock(format!(
            "invalid height {} for block {}",
            node_block.header.height, node_block.header.id
        )));
    }
    let header = Header::from(node_block.header);
    let transactions = node_block
        .transactions
        .into_iter()
        .enumerate()
        .map(|(i, tx)| Transaction {
            id: tx.id,
            index: i as i32,
            size: tx.size,
        })
        .collect();
    Ok(Block {
        header,
        transactions,
    })
}
