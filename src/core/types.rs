use super::node;
use crate::constants::ZERO_HEADER;

pub type Digest32 = String;
pub type GlobalIndex = i64;
pub type HeaderID = Digest32;
pub type Height = i32;
pub type Timestamp = i64;
pub type TransactionID = Digest32;

/// Core block header, as kept in chain state.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub height: Height,
    pub timestamp: Timestamp,
    pub header_id: HeaderID,
    pub parent_id: HeaderID,
}

impl Header {
    /// A header representing chain state prior to the first block.
    pub fn initial() -> Self {
        Self {
            height: 0,
            timestamp: 0,
            header_id: String::from(ZERO_HEADER),
            parent_id: String::from(""),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.height == 0 && self.header_id == ZERO_HEADER
    }
}

impl From<node::models::Header> for Header {
    fn from(header: node::models::Header) -> Self {
        Self {
            height: header.height,
            timestamp: header.timestamp,
            header_id: header.id,
            parent_id: header.parent_id,
        }
    }
}

/// A transaction as extracted from a block, prior to index assignment.
///
/// The timestamp is the owning header's and is not repeated here.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionID,
    /// 0-based position within the block
    pub index: i32,
    /// Size in bytes
    pub size: i32,
}

/// Extracted block data.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

/// A transaction annotated with its assigned global index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTransaction {
    pub id: TransactionID,
    pub global_index: GlobalIndex,
    pub height: Height,
    pub timestamp: Timestamp,
    pub size: i32,
    /// 0-based position within the block
    pub index: i32,
}

/// Position and cursor state of the current best tip.
#[derive(Debug, Clone, PartialEq)]
pub struct TipState {
    pub header: Header,
    /// Last issued global index. -1 until a first transaction is indexed.
    pub last_global_index: GlobalIndex,
    /// Highest timestamp among all indexed main-chain transactions.
    pub max_timestamp: Timestamp,
}

impl TipState {
    /// Tip state of an empty chain.
    pub fn initial() -> Self {
        Self {
            header: Header::initial(),
            last_global_index: -1,
            max_timestamp: 0,
        }
    }

    pub fn height(&self) -> Height {
        self.header.height
    }

    /// Next free global index.
    pub fn next_index(&self) -> GlobalIndex {
        self.last_global_index + 1
    }
}

#[cfg(feature = "test-utilities")]
pub mod testutils {
    use super::*;
    use rand::Rng;

    /// Generates a random 32 byte digest, hex encoded.
    pub fn random_digest32() -> Digest32 {
        let mut rng = rand::thread_rng();
        (0..32)
            .map(|_| format!("{:02x}", rng.gen::<u8>()))
            .collect()
    }

    impl Header {
        pub fn dummy() -> Self {
            Self {
                height: 100,
                timestamp: 1_600_000_000_000,
                header_id: random_digest32(),
                parent_id: random_digest32(),
            }
        }

        /// Returns a child header, one height up, 2 minutes later.
        pub fn child(&self) -> Self {
            Self {
                height: self.height + 1,
                timestamp: self.timestamp + 120_000,
                header_id: random_digest32(),
                parent_id: self.header_id.clone(),
            }
        }

        /// Returns copy with height set to given `height`.
        pub fn height(&self, height: Height) -> Self {
            Self {
                height,
                ..self.clone()
            }
        }

        /// Returns copy with timestamp set to given `timestamp`.
        pub fn timestamp(&self, timestamp: Timestamp) -> Self {
            Self {
                timestamp,
                ..self.clone()
            }
        }
    }

    impl Transaction {
        pub fn dummy() -> Self {
            Self {
                id: random_digest32(),
                index: 0,
                size: 250,
            }
        }
    }

    impl Block {
        pub fn dummy() -> Self {
            Self {
                header: Header::dummy(),
                transactions: vec![],
            }
        }

        /// Returns an empty block extending `parent`.
        pub fn child_of(parent: &Header) -> Self {
            Self {
                header: parent.child(),
                transactions: vec![],
            }
        }

        /// Appends a transaction, fixing up its intra-block position.
        pub fn add_tx(&self, tx: Transaction) -> Self {
            let mut transactions = self.transactions.clone();
            transactions.push(Transaction {
                index: transactions.len() as i32,
                ..tx
            });
            Self {
                header: self.header.clone(),
                transactions,
            }
        }

        /// Returns copy holding `n` fresh transactions.
        pub fn with_txs(&self, n: usize) -> Self {
            let transactions = (0..n)
                .map(|i| Transaction {
                    id: random_digest32(),
                    index: i as i32,
                    size: 250,
                })
                .collect();
            Self {
                header: self.header.clone(),
                transactions,
            }
        }

        /// Returns copy with height set to given `height`.
        pub fn height(&self, height: Height) -> Self {
            Self {
                header: self.header.height(height),
                transactions: self.transactions.clone(),
            }
        }

        /// Returns copy with timestamp set to given `timestamp`.
        pub fn timestamp(&self, timestamp: Timestamp) -> Self {
            Self {
                header: self.header.timestamp(timestamp),
                transactions: self.transactions.clone(),
            }
        }
    }
}
