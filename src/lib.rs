//! # Ember Chain - a minimalist proof-of-work cryptocurrency node
//!
//! A peer-to-peer participant that maintains an authoritative blockchain,
//! a cache of unspent transaction outputs, and a pool of pending
//! transactions; it mines new blocks, relays blocks and transactions, and
//! resolves forks by cumulative work. Everything lives in memory: a restart
//! re-derives the deterministic genesis block and rediscovers peers.
//!
//! ## How the code is organized
//! - `core/`: the consensus machinery (blocks, transactions, canonical
//!   hashing, validation, the chain, proof-of-work accounting, mining)
//! - `storage/`: the in-memory UTXO set and the memory pool
//! - `wallet/`: the node keypair and transaction building
//! - `network/`: peer links, the three-message protocol, the node aggregate
//! - `config/`: environment-driven settings
//! - `cli/`: startup flags and the interactive dot-commands
//! - `utils/`: SHA-256 and secp256k1 primitives
//!
//! ## Where to start reading
//! 1. `core/canonical.rs` pins the hashing contract everything hangs on
//! 2. `core/validator.rs` is the transaction rulebook
//! 3. `core/chain.rs` appends blocks and arbitrates forks
//! 4. `network/node.rs` maps peer messages onto the state machine

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Opt, ReplCommand};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    genesis_block, genesis_secret, Block, Chain, Input, Output, Transaction, Utxo, BLOCK_REWARD,
};
pub use error::{NodeError, Result};
pub use network::{Message, Node, Peers, Reaction, Server};
pub use storage::{MemoryPool, UtxoSet};
pub use wallet::Wallet;
