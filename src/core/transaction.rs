// Value moves through unspent transaction outputs: a transaction consumes
// previous outputs and creates new ones, and the hash commits to everything
// except the input signatures.

use serde::{Deserialize, Serialize};

use crate::core::canonical;
use crate::error::Result;

/// Largest integer the wire format carries exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;
/// Outputs below this amount are rejected as dust
pub const MIN_OUTPUT_AMOUNT: u64 = 2;

/// A spendable amount locked to a compressed secp256k1 public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    #[serde(rename = "publicKey")]
    public_key: String,
    amount: u64,
}

impl Output {
    pub fn new(public_key: impl Into<String>, amount: u64) -> Output {
        Output {
            public_key: public_key.into(),
            amount,
        }
    }

    pub fn get_public_key(&self) -> &str {
        self.public_key.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }
}

/// A reference to a prior output, plus the signature authorizing its spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    hash: String,
    index: u8,
    signature: String,
}

impl Input {
    pub fn new(hash: impl Into<String>, index: u8, signature: impl Into<String>) -> Input {
        Input {
            hash: hash.into(),
            index,
            signature: signature.into(),
        }
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_index(&self) -> u8 {
        self.index
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }

    /// The (hash, index) pair identifying the referenced output
    pub fn outpoint(&self) -> (String, u8) {
        (self.hash.clone(), self.index)
    }
}

/// A confirmed, unspent output together with its location in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Utxo {
    hash: String,
    index: u8,
    #[serde(rename = "publicKey")]
    public_key: String,
    amount: u64,
}

impl Utxo {
    pub fn new(
        hash: impl Into<String>,
        index: u8,
        public_key: impl Into<String>,
        amount: u64,
    ) -> Utxo {
        Utxo {
            hash: hash.into(),
            index,
            public_key: public_key.into(),
            amount,
        }
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_index(&self) -> u8 {
        self.index
    }

    pub fn get_public_key(&self) -> &str {
        self.public_key.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }
}

/// A transfer of value. A coinbase is a transaction with no inputs; the
/// `inputs` key is omitted from its wire form entirely, so a coinbase
/// serializes as `{outputs, hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    hash: String,
}

impl Transaction {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>, hash: String) -> Transaction {
        Transaction {
            inputs,
            outputs,
            hash,
        }
    }

    /// Build the mandatory final transaction of a block, minting `amount` to
    /// `public_key`. The block time is folded into the hash so two coinbases
    /// mined to the same key in different blocks never collide.
    pub fn coinbase(public_key: &str, amount: u64, block_time: u64) -> Result<Transaction> {
        let mut tx = Transaction {
            inputs: vec![],
            outputs: vec![Output::new(public_key, amount)],
            hash: String::new(),
        };
        tx.hash = canonical::coinbase_hash(block_time, &tx)?;
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn get_inputs(&self) -> &[Input] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[Output] {
        self.outputs.as_slice()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    /// The miner fee this transaction carries (one unit per input)
    pub fn fee(&self) -> u64 {
        self.inputs.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinbase_wire_form_omits_inputs() {
        let tx = Transaction::coinbase("02ab", 10, 7).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(!json.contains("inputs"));
        assert!(json.starts_with("{\"outputs\":"));
    }

    #[test]
    fn test_coinbase_hash_varies_with_block_time() {
        let first = Transaction::coinbase("02ab", 10, 1).unwrap();
        let second = Transaction::coinbase("02ab", 10, 2).unwrap();
        assert_ne!(first.get_hash(), second.get_hash());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"outputs":[{"publicKey":"02ab","amount":5}],"hash":"00","extra":1}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn test_missing_inputs_deserializes_as_coinbase() {
        let json = r#"{"outputs":[{"publicKey":"02ab","amount":5}],"hash":"00"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert!(tx.is_coinbase());
        assert_eq!(tx.fee(), 0);
    }
}
