// The memory pool holds validated but unconfirmed transactions, in arrival
// order, plus an index of the outpoints those transactions claim. First
// accepted wins: a pending transaction keeps its claimed UTXOs until it is
// confirmed, displaced by a conflicting confirmation, or the pool is
// cleared wholesale by a chain swap.

use std::collections::HashSet;

use crate::core::validator;
use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::storage::UtxoSet;

#[derive(Debug, Default)]
pub struct MemoryPool {
    txs: Vec<Transaction>,
    used_utxos: HashSet<(String, u8)>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            txs: vec![],
            used_utxos: HashSet::new(),
        }
    }

    /// Validate `tx` against the confirmed UTXO set and accept it if none of
    /// its inputs is already claimed by a pool member. Validation runs
    /// against a scratch block and a copy of `utxos`, so nothing shared is
    /// touched. Returns `Ok(false)` for the silent conflict reject.
    pub fn add_tx(&mut self, tx: &Transaction, utxos: &UtxoSet) -> Result<bool> {
        let mut scratch_block = Block::building(0);
        let mut scratch_utxos = utxos.clone();
        validator::apply_transaction(tx, &mut scratch_block, &mut scratch_utxos)?;

        if tx
            .get_inputs()
            .iter()
            .any(|input| self.used_utxos.contains(&input.outpoint()))
        {
            return Ok(false);
        }

        for input in tx.get_inputs() {
            self.used_utxos.insert(input.outpoint());
        }
        self.txs.push(tx.clone());
        Ok(true)
    }

    /// Index of the pool member spending the given outpoint, if any
    pub fn find_tx_index(&self, hash: &str, index: u8) -> Option<usize> {
        self.txs.iter().position(|tx| {
            tx.get_inputs()
                .iter()
                .any(|input| input.get_hash() == hash && input.get_index() == index)
        })
    }

    /// Evict every pool member whose inputs were consumed by the freshly
    /// confirmed block, releasing all of an evicted member's claims. Members
    /// untouched by the block stay pending. Safe to call repeatedly.
    pub fn remove_block_txs(&mut self, block: &Block) {
        for tx in block.get_txs() {
            if tx.is_coinbase() {
                continue;
            }
            for input in tx.get_inputs() {
                while let Some(position) = self.find_tx_index(input.get_hash(), input.get_index())
                {
                    let evicted = self.txs.remove(position);
                    for claim in evicted.get_inputs() {
                        self.used_utxos.remove(&claim.outpoint());
                    }
                }
            }
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.txs.as_slice()
    }

    pub fn clear(&mut self) {
        self.txs.clear();
        self.used_utxos.clear();
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}
