// One mining attempt: snapshot the pool and the tip, rebuild the pending
// transactions into a fresh candidate, append the coinbase, and try a single
// random nonce against the required difficulty. The caller re-runs attempts
// on a timer, so state accepted from peers between attempts is picked up
// automatically by the next candidate.

use rand::Rng;

use crate::core::transaction::MAX_SAFE_INTEGER;
use crate::core::validator::{self, BLOCK_REWARD};
use crate::core::{canonical, work, Block, Chain, Transaction};
use crate::error::Result;
use crate::storage::MemoryPool;
use crate::utils::current_timestamp;

/// Attempt to mine the next block on `chain`, paying the reward to
/// `reward_key`. Returns `Ok(None)` when the drawn nonce does not meet the
/// required difficulty; an error means a pool transaction no longer replays
/// against the tip and the attempt should simply be retried on fresh state.
pub fn mine_once(chain: &Chain, pool: &MemoryPool, reward_key: &str) -> Result<Option<Block>> {
    let tip = chain.tip();
    let now_secs = current_timestamp()?.div_ceil(1000);
    let time = now_secs.max(tip.get_time() + 1);

    let mut candidate = Block::building(time);
    let mut working_utxos = chain.utxos().clone();
    for tx in pool.transactions() {
        validator::apply_transaction(tx, &mut candidate, &mut working_utxos)?;
    }

    let fees: u64 = pool.transactions().iter().map(Transaction::fee).sum();
    let coinbase = Transaction::coinbase(reward_key, BLOCK_REWARD + fees, time)?;
    validator::apply_coinbase(&coinbase, &mut candidate, &mut working_utxos)?;

    candidate.set_nonce(rand::thread_rng().gen_range(0..=MAX_SAFE_INTEGER));
    let hash = canonical::block_hash(tip.get_hash(), &candidate)?;
    candidate.set_hash(hash);

    if work::block_difficulty(&candidate) >= work::next_difficulty(chain.blocks()) {
        Ok(Some(candidate))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{public_key_hex, random_keypair};

    fn reward_key() -> String {
        let (_, public_key) = random_keypair();
        public_key_hex(&public_key)
    }

    #[test]
    fn test_mined_block_commits_through_add_block() {
        let mut chain = Chain::new();
        let pool = MemoryPool::new();
        let key = reward_key();

        // Required difficulty on a fresh chain is zero, so the very first
        // attempt always succeeds.
        let block = mine_once(&chain, &pool, &key).unwrap().unwrap();
        assert_eq!(block.get_txs().len(), 1);
        let coinbase = block.coinbase().unwrap();
        assert_eq!(coinbase.get_outputs()[0].get_amount(), BLOCK_REWARD);
        assert_eq!(coinbase.get_outputs()[0].get_public_key(), key);

        chain.add_block(block).unwrap();
        assert_eq!(chain.height(), 2);
        assert_eq!(chain.balance_of(&key), BLOCK_REWARD);
    }

    #[test]
    fn test_candidate_time_advances_past_tip() {
        let chain = Chain::new();
        let pool = MemoryPool::new();
        let block = mine_once(&chain, &pool, &reward_key()).unwrap().unwrap();
        assert!(block.get_time() > chain.tip().get_time());
    }
}
