pub const ZERO_HEADER: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub mod settings {
    use crate::core::types::Height;

    /// Maximum number of blocks that can be rolled back.
    ///
    /// Indices of blocks buried deeper than this are considered final.
    /// If a reorg reaches past it, ingestion halts and a resync from a
    /// trusted checkpoint is required.
    pub const ROLLBACK_HORIZON: Height = 20;
}
