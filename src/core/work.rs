//! Proof-of-work accounting
//!
//! Difficulty here is simply the number of leading zero bits in a block
//! hash. The required difficulty walks up or down with observed inter-block
//! times, targeting roughly ten seconds per block, and fork choice compares
//! cumulative work as the sum of 2^difficulty over all blocks.

use num_bigint::BigUint;

use crate::core::Block;

/// Inter-block gaps shorter than this raise the required difficulty
const FAST_INTERVAL_SECS: u64 = 5;
/// Inter-block gaps longer than this lower the required difficulty
const SLOW_INTERVAL_SECS: u64 = 20;
/// Required difficulty is clamped to [0, MAX_DIFFICULTY] at every step
const MAX_DIFFICULTY: i32 = 256;

/// Actual difficulty of a mined block: leading zero bits of its hash.
pub fn block_difficulty(block: &Block) -> u32 {
    leading_zero_bits(block.get_hash())
}

fn leading_zero_bits(hash_hex: &str) -> u32 {
    let mut bits = 0;
    for c in hash_hex.chars() {
        match c.to_digit(16) {
            Some(0) => bits += 4,
            Some(nibble) => {
                bits += nibble.leading_zeros() - 28;
                break;
            }
            None => break,
        }
    }
    bits
}

/// Required difficulty for the block that would extend `blocks`. Walks every
/// observed interval, nudging an accumulator up for fast blocks and down for
/// slow ones, clamped after each step so easy chains cannot go negative.
pub fn next_difficulty(blocks: &[Block]) -> u32 {
    let mut difficulty: i32 = 0;
    for pair in blocks.windows(2) {
        let interval = pair[1].get_time().saturating_sub(pair[0].get_time());
        if interval < FAST_INTERVAL_SECS {
            difficulty += 1;
        } else if interval > SLOW_INTERVAL_SECS {
            difficulty -= 1;
        }
        difficulty = difficulty.clamp(0, MAX_DIFFICULTY);
    }
    difficulty as u32
}

/// Cumulative work of a chain, for fork comparison only. Arbitrary-precision
/// arithmetic keeps the comparison exact at any difficulty.
pub fn chain_difficulty(blocks: &[Block]) -> BigUint {
    let mut total = BigUint::from(0u8);
    for block in blocks {
        total += BigUint::from(1u8) << block_difficulty(block);
    }
    total
}
