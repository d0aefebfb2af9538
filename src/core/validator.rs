// Transaction validation against a building block and a working UTXO set.
// Every check runs before any mutation, so a failure at any step leaves both
// the block and the UTXO set exactly as they were.

use std::collections::HashSet;

use crate::core::canonical;
use crate::core::transaction::{MAX_SAFE_INTEGER, MIN_OUTPUT_AMOUNT};
use crate::core::{Block, Transaction, Utxo};
use crate::error::{NodeError, Result};
use crate::storage::UtxoSet;
use crate::utils::{is_hex_hash, parse_public_key, verify_tx_signature};

/// Newly minted amount every coinbase collects on top of fees
pub const BLOCK_REWARD: u64 = 10;
/// Amount destroyed by every transaction, on top of the per-input fee
pub const TX_BURN: u64 = 1;

/// Validate a user transaction and, on success, append it to the building
/// block and update the working UTXO set: consumed entries are removed and
/// one entry per output is added under the transaction's hash.
pub fn apply_transaction(tx: &Transaction, block: &mut Block, utxos: &mut UtxoSet) -> Result<()> {
    check_transaction_shape(tx)?;

    // Resolve every input against the working set, rejecting a second claim
    // of the same outpoint within this transaction.
    let mut claimed: HashSet<(String, u8)> = HashSet::new();
    let mut consumed: Vec<Utxo> = Vec::with_capacity(tx.get_inputs().len());
    let mut total_in: u64 = 0;
    for input in tx.get_inputs() {
        let utxo = utxos
            .get(input.get_hash(), input.get_index())
            .ok_or_else(|| {
                NodeError::Consistency(format!(
                    "Input references a missing UTXO: {}:{}",
                    input.get_hash(),
                    input.get_index()
                ))
            })?;
        if !claimed.insert(input.outpoint()) {
            return Err(NodeError::Consistency(format!(
                "Input claims the same UTXO twice: {}:{}",
                input.get_hash(),
                input.get_index()
            )));
        }
        total_in = total_in
            .checked_add(utxo.get_amount())
            .ok_or_else(|| NodeError::Consistency("Input amount overflow".to_string()))?;
        consumed.push(utxo.clone());
    }

    let total_out = output_total(tx)?;

    // One unit burned per transaction plus one unit of fee per input
    let expected_net = tx.get_inputs().len() as u64 + TX_BURN;
    let expected_total = total_out
        .checked_add(expected_net)
        .ok_or_else(|| NodeError::Consistency("Output amount overflow".to_string()))?;
    if total_in != expected_total {
        return Err(NodeError::Consistency(format!(
            "Net amount mismatch: inputs {total_in}, outputs {total_out}, expected net {expected_net}"
        )));
    }

    let computed = canonical::transaction_hash(tx)?;
    if computed != tx.get_hash() {
        return Err(NodeError::Consistency(format!(
            "Transaction hash mismatch: declared {}, computed {computed}",
            tx.get_hash()
        )));
    }

    // The signature of every input must verify against the owner key of the
    // UTXO it spends, over the transaction hash as message.
    for (input, utxo) in tx.get_inputs().iter().zip(consumed.iter()) {
        if !verify_tx_signature(utxo.get_public_key(), input.get_signature(), tx.get_hash()) {
            return Err(NodeError::Consistency(format!(
                "Signature mismatch on input {}:{}",
                input.get_hash(),
                input.get_index()
            )));
        }
    }

    // Commit
    for input in tx.get_inputs() {
        utxos.remove(input.get_hash(), input.get_index());
    }
    for (index, output) in tx.get_outputs().iter().enumerate() {
        utxos.insert(Utxo::new(
            tx.get_hash(),
            index as u8,
            output.get_public_key(),
            output.get_amount(),
        ));
    }
    block.push_tx(tx.clone());
    Ok(())
}

/// Validate a coinbase and, on success, append it to the building block and
/// add its single output to the working UTXO set. Must be called exactly
/// once per block, after all user transactions.
pub fn apply_coinbase(coinbase: &Transaction, block: &mut Block, utxos: &mut UtxoSet) -> Result<()> {
    if !coinbase.is_coinbase() {
        return Err(NodeError::Structural(
            "Coinbase must not have inputs".to_string(),
        ));
    }
    if coinbase.get_outputs().len() != 1 {
        return Err(NodeError::Structural(format!(
            "Coinbase must have exactly one output, got {}",
            coinbase.get_outputs().len()
        )));
    }
    if block.get_txs().iter().any(|tx| tx.is_coinbase()) {
        return Err(NodeError::Consistency(
            "Block already contains a coinbase".to_string(),
        ));
    }

    let output = &coinbase.get_outputs()[0];
    check_output(output.get_public_key(), output.get_amount())?;

    // The reward is fixed: newly minted currency plus one fee unit per input
    // across the block's user transactions.
    let fees: u64 = block.get_txs().iter().map(Transaction::fee).sum();
    let expected = BLOCK_REWARD + fees;
    if output.get_amount() != expected {
        return Err(NodeError::Consistency(format!(
            "Coinbase reward mismatch: declared {}, expected {expected}",
            output.get_amount()
        )));
    }

    let computed = canonical::coinbase_hash(block.get_time(), coinbase)?;
    if computed != coinbase.get_hash() {
        return Err(NodeError::Consistency(format!(
            "Coinbase hash mismatch: declared {}, computed {computed}",
            coinbase.get_hash()
        )));
    }

    utxos.insert(Utxo::new(
        coinbase.get_hash(),
        0,
        output.get_public_key(),
        output.get_amount(),
    ));
    block.push_tx(coinbase.clone());
    Ok(())
}

fn check_transaction_shape(tx: &Transaction) -> Result<()> {
    if tx.get_inputs().is_empty() {
        return Err(NodeError::Structural(
            "Transaction must have at least one input".to_string(),
        ));
    }
    if !(1..=2).contains(&tx.get_outputs().len()) {
        return Err(NodeError::Structural(format!(
            "Transaction must have one or two outputs, got {}",
            tx.get_outputs().len()
        )));
    }
    for input in tx.get_inputs() {
        if !is_hex_hash(input.get_hash()) {
            return Err(NodeError::Structural(format!(
                "Input hash is not a 64-char hex string: {}",
                input.get_hash()
            )));
        }
        if input.get_index() > 1 {
            return Err(NodeError::Structural(format!(
                "Input index must be 0 or 1, got {}",
                input.get_index()
            )));
        }
        let signature_len = input.get_signature().len();
        if !(20..=144).contains(&signature_len) {
            return Err(NodeError::Structural(format!(
                "Signature length out of range: {signature_len}"
            )));
        }
    }
    for output in tx.get_outputs() {
        check_output(output.get_public_key(), output.get_amount())?;
    }
    Ok(())
}

fn check_output(public_key: &str, amount: u64) -> Result<()> {
    parse_public_key(public_key)?;
    if amount < MIN_OUTPUT_AMOUNT {
        return Err(NodeError::Structural(format!(
            "Output amount {amount} is below the dust floor of {MIN_OUTPUT_AMOUNT}"
        )));
    }
    if amount > MAX_SAFE_INTEGER {
        return Err(NodeError::Structural(format!(
            "Output amount {amount} exceeds the safe integer range"
        )));
    }
    Ok(())
}

fn output_total(tx: &Transaction) -> Result<u64> {
    let mut total: u64 = 0;
    for output in tx.get_outputs() {
        total = total
            .checked_add(output.get_amount())
            .ok_or_else(|| NodeError::Consistency("Output amount overflow".to_string()))?;
    }
    Ok(total)
}
