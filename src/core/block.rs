use serde::{Deserialize, Serialize};

use crate::core::Transaction;

/// A block: timestamp in whole seconds, an ordered transaction list whose
/// last element is the coinbase, the proof-of-work nonce, and the hash over
/// the previous block's hash plus this block's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    time: u64,
    txs: Vec<Transaction>,
    nonce: u64,
    hash: String,
}

impl Block {
    /// An empty block under construction; the validator fills `txs` and the
    /// miner fills `nonce` and `hash`.
    pub(crate) fn building(time: u64) -> Block {
        Block {
            time,
            txs: vec![],
            nonce: 0,
            hash: String::new(),
        }
    }

    pub(crate) fn from_parts(time: u64, txs: Vec<Transaction>, nonce: u64, hash: String) -> Block {
        Block {
            time,
            txs,
            nonce,
            hash,
        }
    }

    pub fn get_time(&self) -> u64 {
        self.time
    }

    pub fn get_txs(&self) -> &[Transaction] {
        self.txs.as_slice()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.txs.last().filter(|tx| tx.is_coinbase())
    }

    pub(crate) fn push_tx(&mut self, tx: Transaction) {
        self.txs.push(tx);
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}
