//! Utility functions and helpers
//!
//! This module contains the cryptographic primitives (SHA-256, secp256k1)
//! and timestamp helpers used throughout the node.

pub mod crypto;

pub use crypto::{
    current_timestamp, current_unix_secs, is_hex_hash, keypair_from_secret, parse_public_key,
    public_key_hex, random_keypair, sha256_digest, sha256_hex, sign_tx_hash, verify_tx_signature,
};
