//! Synthetic block fixtures, keyed by a short spec string.
//!
//! A spec looks like `"3bis"` or `"4bis>3bis"` or `"4@1688169600000"`:
//!   * leading digits give the height
//!   * `>parent` overrides the parent (defaults to the plain block one below)
//!   * `@millis` overrides the timestamp
//!   * a trailing `*` marks the block as off the main chain (stripped here,
//!     interpreted by the mock node)
//!
//! Everything else is derived deterministically from the spec, so tests can
//! assert on exact header and transaction ids.

use gidx::constants::ZERO_HEADER;

/// Transactions per fixture block.
pub const TXS_PER_BLOCK: usize = 2;

const BASE_TIMESTAMP: i64 = 1672531200000;
const BLOCK_INTERVAL_MS: i64 = 120_000;

pub struct TestBlock {
    id: String,
    height: i32,
    timestamp: i64,
    parent: String,
}

impl TestBlock {
    pub fn from_id(spec: &str) -> Self {
        let spec = spec.strip_suffix('*').unwrap_or(spec);
        let (spec, timestamp_override) = match spec.split_once('@') {
            Some((s, ms)) => (s, Some(ms.parse::<i64>().expect("millis after @"))),
            None => (spec, None),
        };
        let (id, parent_override) = match spec.split_once('>') {
            Some((s, p)) => (s, Some(p.to_string())),
            None => (spec, None),
        };
        let digits: String = id.chars().take_while(|c| c.is_ascii_digit()).collect();
        let height: i32 = digits.parse().expect("spec starts with a height");
        let parent = parent_override.unwrap_or_else(|| {
            if height == 1 {
                String::new()
            } else {
                (height - 1).to_string()
            }
        });
        let timestamp =
            timestamp_override.unwrap_or(BASE_TIMESTAMP + height as i64 * BLOCK_INTERVAL_MS);
        Self {
            id: id.to_string(),
            height,
            timestamp,
            parent,
        }
    }

    /// Returns block's header id
    pub fn header_id(&self) -> String {
        header_id_for(&self.id)
    }

    /// Returns block's parent header id
    pub fn parent_id(&self) -> String {
        if self.parent.is_empty() {
            String::from(ZERO_HEADER)
        } else {
            header_id_for(&self.parent)
        }
    }

    /// Returns block's height
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns deterministic transaction ids
    pub fn tx_ids(&self) -> Vec<String> {
        (0..TXS_PER_BLOCK)
            .map(|i| format!("{}-tx{}", self.id, i))
            .collect()
    }

    /// Returns block as json object, shaped like a node API response
    pub fn to_json(&self) -> serde_json::Value {
        let transactions: Vec<serde_json::Value> = self
            .tx_ids()
            .iter()
            .map(|id| serde_json::json!({"id": id, "size": 250}))
            .collect();
        serde_json::json!({
            "header": self.header_json(),
            "transactions": transactions,
            "size": 1285,
        })
    }

    /// Returns block's header as json object
    pub fn header_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.header_id(),
            "parentId": self.parent_id(),
            "height": self.height,
            "timestamp": self.timestamp,
            "size": 221,
        })
    }
}

/// Deterministic 64 char header id from a fixture id.
fn header_id_for(id: &str) -> String {
    format!("{:0>64}", format!("{:x>8}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parentage() {
        let tb = TestBlock::from_id("3bis");
        assert_eq!(tb.height(), 3);
        assert_eq!(tb.parent_id(), TestBlock::from_id("2").header_id());
    }

    #[test]
    fn test_overrides() {
        let tb = TestBlock::from_id("4bis>3bis@1688169600000*");
        assert_eq!(tb.height(), 4);
        assert_eq!(tb.parent_id(), TestBlock::from_id("3bis").header_id());
        assert_eq!(tb.timestamp(), 1688169600000);
    }
}
