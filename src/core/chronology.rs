use itertools::Itertools;

use super::types::Header;
use super::types::HeaderID;
use super::types::Timestamp;
use super::types::TipState;

/// How a candidate block's transactions are to be ordered relative to
/// already indexed history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderingDecision {
    /// Block timestamp is consistent with prior history.
    /// Transactions keep their intra-block order.
    NaturalOrder,
    /// Block timestamp precedes already indexed transactions.
    /// Transactions are still appended after the tip's, under the
    /// height-based fallback key. Indices issued so far are left alone.
    HeightFallback {
        /// Highest timestamp indexed prior to the violating block.
        reference_timestamp: Timestamp,
    },
}

/// Flagged whenever a block's timestamp goes back in time relative to the
/// chain it extends. An observability signal, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChronologyViolationDetected {
    pub header_id: HeaderID,
    pub violating_timestamp: Timestamp,
    pub reference_timestamp: Timestamp,
}

/// Decides how a candidate block's transactions get ordered.
///
/// All transactions within a block share the header timestamp, so the
/// block's lowest timestamp is just `header.timestamp`.
pub fn validate(header: &Header, tip: &TipState) -> OrderingDecision {
    if header.timestamp >= tip.max_timestamp {
        OrderingDecision::NaturalOrder
    } else {
        OrderingDecision::HeightFallback {
            reference_timestamp: tip.max_timestamp,
        }
    }
}

impl OrderingDecision {
    /// Returns the violation event to be flagged, if any.
    pub fn flag(&self, header: &Header) -> Option<ChronologyViolationDetected> {
        match self {
            Self::NaturalOrder => None,
            Self::HeightFallback {
                reference_timestamp,
            } => Some(ChronologyViolationDetected {
                header_id: header.header_id.clone(),
                violating_timestamp: header.timestamp,
                reference_timestamp: *reference_timestamp,
            }),
        }
    }
}

/// Orders a batch of pending headers by the fallback key.
///
/// The key is (height, timestamp), with intra-block position applying
/// within each block downstream. Arrival order carries no weight, so
/// repeated runs over the same set always produce the same sequence.
pub fn order_pending(headers: Vec<Header>) -> Vec<Header> {
    headers
        .into_iter()
        .sorted_by(|a, b| {
            (a.height, a.timestamp, &a.header_id).cmp(&(b.height, b.timestamp, &b.header_id))
        })
        .collect()
}
