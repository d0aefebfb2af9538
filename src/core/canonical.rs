//! Canonical hashing forms
//!
//! Every hash in the system is SHA-256 over the UTF-8 bytes of a compact
//! JSON rendering with fields in a fixed order. Two nodes interoperate only
//! if they agree on these bytes exactly, so the forms are pinned here:
//!
//! - transaction: `{"inputs":[{"hash":H,"index":I},...],"outputs":[{"publicKey":P,"amount":A},...]}`
//!   with signatures and the hash field omitted; a coinbase omits the
//!   `inputs` key entirely and hashes as `{"outputs":[...]}`.
//! - block: `{"time":T,"txs":[...],"nonce":N}` with each transaction in its
//!   form above, prefixed by the previous block's hash string (no separator).
//! - coinbase: its form above, prefixed by the block time rendered as a
//!   decimal integer (no separator).
//! - genesis transaction: its form above, prefixed by the literal `0`.
//!
//! serde emits struct fields in declaration order, which is what pins the
//! key order below.

use serde::Serialize;

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::error::Result;
use crate::utils::sha256_hex;

#[derive(Serialize)]
struct InputForm<'a> {
    hash: &'a str,
    index: u8,
}

#[derive(Serialize)]
struct OutputForm<'a> {
    #[serde(rename = "publicKey")]
    public_key: &'a str,
    amount: u64,
}

#[derive(Serialize)]
struct TransactionForm<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<InputForm<'a>>,
    outputs: Vec<OutputForm<'a>>,
}

#[derive(Serialize)]
struct BlockForm<'a> {
    time: u64,
    txs: Vec<TransactionForm<'a>>,
    nonce: u64,
}

fn transaction_form(tx: &Transaction) -> TransactionForm<'_> {
    TransactionForm {
        inputs: tx
            .get_inputs()
            .iter()
            .map(|input| InputForm {
                hash: input.get_hash(),
                index: input.get_index(),
            })
            .collect(),
        outputs: tx
            .get_outputs()
            .iter()
            .map(|output| OutputForm {
                public_key: output.get_public_key(),
                amount: output.get_amount(),
            })
            .collect(),
    }
}

fn transaction_payload(tx: &Transaction) -> Result<String> {
    Ok(serde_json::to_string(&transaction_form(tx))?)
}

fn block_payload(block: &Block) -> Result<String> {
    let form = BlockForm {
        time: block.get_time(),
        txs: block.get_txs().iter().map(transaction_form).collect(),
        nonce: block.get_nonce(),
    };
    Ok(serde_json::to_string(&form)?)
}

/// Hash of a user transaction: signatures and hash field omitted.
pub fn transaction_hash(tx: &Transaction) -> Result<String> {
    Ok(sha256_hex(transaction_payload(tx)?.as_bytes()))
}

/// Hash of the genesis transaction: prefixed with the literal `0`.
pub fn genesis_transaction_hash(tx: &Transaction) -> Result<String> {
    let payload = format!("0{}", transaction_payload(tx)?);
    Ok(sha256_hex(payload.as_bytes()))
}

/// Hash of a coinbase: prefixed with the decimal block time.
pub fn coinbase_hash(block_time: u64, coinbase: &Transaction) -> Result<String> {
    let payload = format!("{block_time}{}", transaction_payload(coinbase)?);
    Ok(sha256_hex(payload.as_bytes()))
}

/// Hash of a block: prefixed with the previous block's hash (empty for the
/// genesis block, which has no predecessor).
pub fn block_hash(previous_hash: &str, block: &Block) -> Result<String> {
    let payload = format!("{previous_hash}{}", block_payload(block)?);
    Ok(sha256_hex(payload.as_bytes()))
}
