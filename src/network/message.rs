use serde::{Deserialize, Serialize};

use crate::core::{Block, Transaction};

/// The three-message peer protocol. Each message travels as one JSON object
/// tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// The sender's tip. Sent on connection open, after a successful mine,
    /// and when rebroadcasting an accepted peer block.
    #[serde(rename = "LATESTBLOCK")]
    LatestBlock { block: Block },
    /// The sender's full chain; the answer to a block that does not validate
    /// as our next block, and to a fork offer that is not strictly heavier.
    #[serde(rename = "BLOCKCHAIN")]
    Blockchain { chain: Vec<Block> },
    /// A candidate for the memory pool.
    #[serde(rename = "TRANSACTION")]
    Transaction { tx: Transaction },
}
