//! Error handling for the node
//!
//! This module provides the error types shared by every subsystem of the node.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Error types for consensus, wallet and network operations
#[derive(Debug, Clone)]
pub enum NodeError {
    /// Malformed data: wrong shape, wrong hex length, out-of-range integer
    Structural(String),
    /// Well-formed but inconsistent content: missing UTXO, bad net amount,
    /// bad coinbase reward, bad timestamp, insufficient difficulty,
    /// hash mismatch, signature mismatch
    Consistency(String),
    /// Wallet cannot cover the requested amount plus fees
    InsufficientFunds { required: u64, available: u64 },
    /// Cryptographic operation errors
    Crypto(String),
    /// Network communication errors
    Network(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Structural(msg) => write!(f, "Structural error: {msg}"),
            NodeError::Consistency(msg) => write!(f, "Consistency error: {msg}"),
            NodeError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            NodeError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            NodeError::Network(msg) => write!(f, "Network error: {msg}"),
            NodeError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            NodeError::Config(msg) => write!(f, "Configuration error: {msg}"),
            NodeError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<secp256k1::Error> for NodeError {
    fn from(err: secp256k1::Error) -> Self {
        NodeError::Crypto(err.to_string())
    }
}
