use serde::Deserialize;

use crate::core::types::HeaderID;
use crate::core::types::Height;
use crate::core::types::Timestamp;
use crate::core::types::TransactionID;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub full_height: Height,
    pub best_header_id: HeaderID,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub size: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub id: HeaderID,
    pub parent_id: HeaderID,
    pub height: Height,
    pub timestamp: Timestamp,
    pub size: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionID,
    pub size: i32,
}
