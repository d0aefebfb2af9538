// The authoritative chain state: the block sequence from genesis plus the
// canonical UTXO set, both exclusively owned here. Peer blocks come in
// through add_block, full competing chains through swap_chains.

use std::cmp::Ordering;

use once_cell::sync::Lazy;

use crate::core::transaction::MAX_SAFE_INTEGER;
use crate::core::validator::{self, BLOCK_REWARD};
use crate::core::{canonical, work, Block, Output, Transaction, Utxo};
use crate::error::{NodeError, Result};
use crate::storage::UtxoSet;
use crate::utils::{
    current_unix_secs, is_hex_hash, keypair_from_secret, public_key_hex, sha256_digest,
};

/// How far into the future a block timestamp may run ahead of our clock
const MAX_CLOCK_DRIFT_SECS: u64 = 10;

/// The genesis key is derived from this fixed phrase, so every node starts
/// from the identical block without any exchange.
const GENESIS_SEED: &str = "Those who have not learned history are doomed to repeat it.";

static GENESIS: Lazy<(Block, UtxoSet)> = Lazy::new(|| {
    build_genesis().expect("genesis construction is deterministic and must succeed")
});

/// The secret key bytes of the genesis output's owner. Public knowledge by
/// construction; handy for demos and tests that spend the first coins.
pub fn genesis_secret() -> Vec<u8> {
    sha256_digest(GENESIS_SEED.as_bytes())
}

pub fn genesis_block() -> &'static Block {
    &GENESIS.0
}

fn build_genesis() -> Result<(Block, UtxoSet)> {
    let (_, public_key) = keypair_from_secret(&genesis_secret())?;
    let output = Output::new(public_key_hex(&public_key), BLOCK_REWARD);

    let unsigned = Transaction::new(vec![], vec![output.clone()], String::new());
    let tx_hash = canonical::genesis_transaction_hash(&unsigned)?;
    let tx = Transaction::new(vec![], vec![output.clone()], tx_hash.clone());

    let mut block = Block::from_parts(0, vec![tx], 0, String::new());
    let block_hash = canonical::block_hash("", &block)?;
    block.set_hash(block_hash);

    let mut utxos = UtxoSet::new();
    utxos.insert(Utxo::new(
        tx_hash,
        0,
        output.get_public_key(),
        output.get_amount(),
    ));
    Ok((block, utxos))
}

pub struct Chain {
    blocks: Vec<Block>,
    utxos: UtxoSet,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Chain {
        Chain {
            blocks: vec![GENESIS.0.clone()],
            utxos: GENESIS.1.clone(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds at least the genesis block")
    }

    pub fn height(&self) -> usize {
        self.blocks.len()
    }

    pub fn balance_of(&self, public_key: &str) -> u64 {
        self.utxos.balance_of(public_key)
    }

    /// Observed inter-block times in seconds, oldest first
    pub fn intervals(&self) -> Vec<u64> {
        self.blocks
            .windows(2)
            .map(|pair| pair[1].get_time().saturating_sub(pair[0].get_time()))
            .collect()
    }

    /// Validate `block` as the next block and append it. The transactions
    /// are replayed into a working block against a working UTXO copy, so a
    /// failure at any point leaves the chain untouched.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        if block.get_txs().is_empty() {
            return Err(NodeError::Structural(
                "Block must contain at least the coinbase".to_string(),
            ));
        }
        if block.get_time() > MAX_SAFE_INTEGER || block.get_nonce() > MAX_SAFE_INTEGER {
            return Err(NodeError::Structural(
                "Block time and nonce must stay in the safe integer range".to_string(),
            ));
        }
        if !is_hex_hash(block.get_hash()) {
            return Err(NodeError::Structural(format!(
                "Block hash is not a 64-char hex string: {}",
                block.get_hash()
            )));
        }

        if block.get_time() <= self.tip().get_time() {
            return Err(NodeError::Consistency(format!(
                "Block time {} does not advance past the tip at {}",
                block.get_time(),
                self.tip().get_time()
            )));
        }
        let now = current_unix_secs()?;
        if block.get_time() > now + MAX_CLOCK_DRIFT_SECS {
            return Err(NodeError::Consistency(format!(
                "Block time {} is too far in the future",
                block.get_time()
            )));
        }

        let mut working = Block::building(block.get_time());
        let mut working_utxos = self.utxos.clone();
        let (user_txs, coinbase) = block.get_txs().split_at(block.get_txs().len() - 1);
        for tx in user_txs {
            validator::apply_transaction(tx, &mut working, &mut working_utxos)?;
        }
        validator::apply_coinbase(&coinbase[0], &mut working, &mut working_utxos)?;

        working.set_nonce(block.get_nonce());
        let computed = canonical::block_hash(self.tip().get_hash(), &working)?;
        if computed != block.get_hash() {
            return Err(NodeError::Consistency(format!(
                "Block hash mismatch: declared {}, computed {computed}",
                block.get_hash()
            )));
        }
        working.set_hash(block.get_hash().to_string());

        let required = work::next_difficulty(&self.blocks);
        let actual = work::block_difficulty(&working);
        if actual < required {
            return Err(NodeError::Consistency(format!(
                "Insufficient difficulty: {actual} bits, {required} required"
            )));
        }

        self.blocks.push(working);
        self.utxos = working_utxos;
        Ok(())
    }

    /// Validate a competing chain by rebuilding it from genesis, and adopt
    /// it iff its cumulative work strictly exceeds ours. Returns how the
    /// candidate's work compares to the current chain's; `Greater` means the
    /// swap happened. Equal-work candidates are rejected, so arrival order
    /// never reorganizes the chain.
    pub fn swap_chains(&mut self, candidate: &[Block]) -> Result<Ordering> {
        let first = candidate
            .first()
            .ok_or_else(|| NodeError::Structural("Candidate chain is empty".to_string()))?;
        if first != genesis_block() {
            return Err(NodeError::Consistency(
                "Candidate chain does not start at the genesis block".to_string(),
            ));
        }

        let mut rebuilt = Chain::new();
        for block in &candidate[1..] {
            rebuilt.add_block(block.clone())?;
        }

        let ordering =
            work::chain_difficulty(&rebuilt.blocks).cmp(&work::chain_difficulty(&self.blocks));
        if ordering == Ordering::Greater {
            *self = rebuilt;
        }
        Ok(ordering)
    }
}
