use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use super::node::Node;
use super::node::NodeError;
use super::store::Repository;
use super::store::StoreError;
use super::types::Header;
use super::types::HeaderID;
use super::types::Height;

/// Ingestion phases around a chain reorganization.
///
/// Normal extension runs in `Extending`. A block that doesn't extend the
/// tip moves through `ForkDetected` -> `Unwinding` -> `Replaying` and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Extending,
    ForkDetected,
    Unwinding,
    Replaying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extending => write!(f, "extending"),
            Self::ForkDetected => write!(f, "fork-detected"),
            Self::Unwinding => write!(f, "unwinding"),
            Self::Replaying => write!(f, "replaying"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReorgError {
    /// The fork point lies deeper than the rollback horizon. Indices past
    /// the horizon are promised stable, so this cannot be recovered from
    /// without an operator driven resync.
    #[error("reorg past block {header_id} exceeds the rollback horizon of {horizon} blocks")]
    BeyondHorizon {
        header_id: HeaderID,
        horizon: Height,
    },
    #[error("header {0} not found while walking fork branch")]
    MissingHeader(HeaderID),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A resolved fork: the last shared block and the branch replacing
/// everything above it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorgPlan {
    /// Common ancestor. Still on the main chain, cursor rewinds to it.
    pub ancestor: Header,
    /// Competing branch headers, lowest first.
    pub branch: Vec<Header>,
}

impl ReorgPlan {
    /// Number of main chain blocks to unwind.
    pub fn depth(&self, tip_height: Height) -> Height {
        tip_height - self.ancestor.height
    }
}

/// Source of competing branch headers during fork resolution.
#[async_trait]
pub trait BranchSource {
    async fn header(&self, header_id: &HeaderID) -> Result<Header, NodeError>;
}

#[async_trait]
impl BranchSource for Node {
    async fn header(&self, header_id: &HeaderID) -> Result<Header, NodeError> {
        Ok(Header::from(self.api.header(header_id).await?))
    }
}

/// Walks `candidate`'s ancestry back to the main chain and returns the
/// unwind/replay plan.
///
/// `candidate` is a block header that does not extend the current tip.
/// Side-chain parents are fetched from `source`, main chain membership is
/// checked against `store`. Gives up past `horizon` blocks below the tip.
pub async fn resolve<S, R>(
    candidate: &Header,
    source: &S,
    store: &mut R,
    tip_height: Height,
    horizon: Height,
) -> Result<ReorgPlan, ReorgError>
where
    S: BranchSource + Sync,
    R: Repository + Send,
{
    let mut branch = vec![candidate.clone()];
    let mut cursor = candidate.clone();
    loop {
        if let Some(ancestor) = store.get_main_header(&cursor.parent_id).await? {
            if tip_height - ancestor.height > horizon {
                return Err(ReorgError::BeyondHorizon {
                    header_id: cursor.header_id,
                    horizon,
                });
            }
            branch.reverse();
            return Ok(ReorgPlan { ancestor, branch });
        }
        // Best case the ancestor sits right below the cursor. If even that
        // is out of reach there is no point fetching further back.
        if tip_height - (cursor.height - 1) > horizon {
            return Err(ReorgError::BeyondHorizon {
                header_id: cursor.header_id,
                horizon,
            });
        }
        cursor = match source.header(&cursor.parent_id).await {
            Ok(header) => header,
            Err(NodeError::API404NotFound(_)) => {
                return Err(ReorgError::MissingHeader(cursor.parent_id.clone()));
            }
            Err(e) => return Err(ReorgError::Node(e)),
        };
        branch.push(cursor.clone());
    }
}
