use std::cmp::Ordering;

use log::{info, warn};

use crate::core::{miner, Block, Chain, Transaction};
use crate::error::{NodeError, Result};
use crate::network::Message;
use crate::storage::MemoryPool;
use crate::wallet::Wallet;

/// What the network layer must do after a message has been handled
#[derive(Debug)]
pub enum Reaction {
    /// Relay to every peer except the sender
    Broadcast(Message),
    /// Answer the sender only
    Respond(Message),
    /// Nothing to send
    Ignore,
}

/// The node aggregate: the chain (with its UTXO set), the memory pool and
/// the wallet, owned together so every mutation happens under one lock.
pub struct Node {
    chain: Chain,
    pool: MemoryPool,
    wallet: Wallet,
}

impl Node {
    pub fn new(wallet: Wallet) -> Node {
        Node {
            chain: Chain::new(),
            pool: MemoryPool::new(),
            wallet,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Our tip, for greeting a fresh connection
    pub fn tip_message(&self) -> Message {
        Message::LatestBlock {
            block: self.chain.tip().clone(),
        }
    }

    fn chain_message(&self) -> Message {
        Message::Blockchain {
            chain: self.chain.blocks().to_vec(),
        }
    }

    /// Handle one peer message. Never fails: every validation error is
    /// absorbed here and turned into the protocol's answer for that case.
    pub fn handle_message(&mut self, message: Message) -> Reaction {
        match message {
            Message::LatestBlock { block } => self.handle_block(block),
            Message::Blockchain { chain } => self.handle_chain(chain),
            Message::Transaction { tx } => self.handle_tx(tx),
        }
    }

    /// A peer's tip. If it extends our chain, adopt it, drop the pool
    /// entries it confirmed and relay our (new) tip; otherwise answer with
    /// our full chain so the peer can resolve the fork.
    fn handle_block(&mut self, block: Block) -> Reaction {
        match self.chain.add_block(block) {
            Ok(()) => {
                let tip = self.chain.tip().clone();
                info!("Accepted block {} at height {}", tip.get_hash(), self.chain.height());
                self.pool.remove_block_txs(&tip);
                Reaction::Broadcast(Message::LatestBlock { block: tip })
            }
            Err(e) => {
                warn!("Peer block rejected: {e}");
                Reaction::Respond(self.chain_message())
            }
        }
    }

    /// A peer's full chain. Swap it in iff it carries strictly more work;
    /// answer a lighter (or invalid) offer with our chain; ignore equal work.
    fn handle_chain(&mut self, candidate: Vec<Block>) -> Reaction {
        match self.chain.swap_chains(&candidate) {
            Ok(Ordering::Greater) => {
                info!(
                    "Swapped in a heavier chain of {} blocks, clearing the pool",
                    self.chain.height()
                );
                self.pool.clear();
                Reaction::Broadcast(self.tip_message())
            }
            Ok(Ordering::Less) => Reaction::Respond(self.chain_message()),
            Ok(Ordering::Equal) => Reaction::Ignore,
            Err(e) => {
                warn!("Peer chain rejected: {e}");
                Reaction::Respond(self.chain_message())
            }
        }
    }

    /// A pool candidate. Accepted transactions are relayed onward; rejects
    /// of either kind stay silent.
    fn handle_tx(&mut self, tx: Transaction) -> Reaction {
        match self.pool.add_tx(&tx, self.chain.utxos()) {
            Ok(true) => {
                info!("Pooled transaction {}", tx.get_hash());
                Reaction::Broadcast(Message::Transaction { tx })
            }
            Ok(false) => Reaction::Ignore,
            Err(e) => {
                warn!("Peer transaction rejected: {e}");
                Reaction::Ignore
            }
        }
    }

    /// Build, sign and pool a spend from our wallet. The transaction still
    /// needs to be broadcast by the caller.
    pub fn send(&mut self, amount: u64, recipient: &str) -> Result<Transaction> {
        let tx = self.wallet.make_tx(amount, recipient, self.chain.utxos())?;
        if !self.pool.add_tx(&tx, self.chain.utxos())? {
            return Err(NodeError::Consistency(
                "Transaction conflicts with a pending pool entry".to_string(),
            ));
        }
        Ok(tx)
    }

    /// One mining attempt. On success the block is committed, confirmed pool
    /// entries are evicted, and the adopted tip is returned for broadcast.
    pub fn mine_step(&mut self) -> Result<Option<Block>> {
        let mined = miner::mine_once(&self.chain, &self.pool, &self.wallet.public_key_hex())?;
        match mined {
            Some(block) => {
                self.chain.add_block(block)?;
                let tip = self.chain.tip().clone();
                self.pool.remove_block_txs(&tip);
                Ok(Some(tip))
            }
            None => Ok(None),
        }
    }

    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }
}
