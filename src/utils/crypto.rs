use data_encoding::HEXLOWER;
use once_cell::sync::Lazy;
use ring::digest::{Context, SHA256};
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::error::{NodeError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide signing context; building one per call is needlessly slow.
static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub fn current_timestamp() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| NodeError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in u64
    if duration > u64::MAX as u128 {
        return Err(NodeError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as u64)
}

pub fn current_unix_secs() -> Result<u64> {
    Ok(current_timestamp()? / 1000)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(data).as_slice())
}

/// Whether `value` is a 64-character lowercase hex SHA-256 string.
pub fn is_hex_hash(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub fn keypair_from_secret(secret: &[u8]) -> Result<(SecretKey, PublicKey)> {
    let secret_key = SecretKey::from_slice(secret)?;
    let public_key = PublicKey::from_secret_key(&SECP, &secret_key);
    Ok((secret_key, public_key))
}

pub fn random_keypair() -> (SecretKey, PublicKey) {
    SECP.generate_keypair(&mut rand::thread_rng())
}

/// Hex of the 33-byte compressed point encoding.
pub fn public_key_hex(public_key: &PublicKey) -> String {
    HEXLOWER.encode(public_key.serialize().as_slice())
}

/// Parse a 66-hex-char compressed secp256k1 point. Uppercase hex and
/// non-canonical encodings are rejected.
pub fn parse_public_key(hex: &str) -> Result<PublicKey> {
    if hex.len() != 66 {
        return Err(NodeError::Structural(format!(
            "Public key must be 66 hex characters, got {}",
            hex.len()
        )));
    }
    let bytes = HEXLOWER
        .decode(hex.as_bytes())
        .map_err(|e| NodeError::Structural(format!("Invalid public key encoding: {e}")))?;
    Ok(PublicKey::from_slice(bytes.as_slice())?)
}

/// Sign a transaction hash (64 hex chars) with the given key. The message is
/// the 32-byte digest the hash encodes; the returned signature is DER, hex.
pub fn sign_tx_hash(secret_key: &SecretKey, tx_hash: &str) -> Result<String> {
    let message = message_from_tx_hash(tx_hash)?;
    let signature = SECP.sign_ecdsa(&message, secret_key);
    Ok(HEXLOWER.encode(signature.serialize_der().as_ref()))
}

/// Verify a DER-hex signature over a transaction hash against a compressed
/// public key. Any decoding failure counts as a verification failure.
pub fn verify_tx_signature(public_key_hex: &str, signature_hex: &str, tx_hash: &str) -> bool {
    let public_key = match parse_public_key(public_key_hex) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let der = match HEXLOWER.decode(signature_hex.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = match Signature::from_der(der.as_slice()) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    let message = match message_from_tx_hash(tx_hash) {
        Ok(msg) => msg,
        Err(_) => return false,
    };
    SECP.verify_ecdsa(&message, &signature, &public_key).is_ok()
}

fn message_from_tx_hash(tx_hash: &str) -> Result<Message> {
    let digest = HEXLOWER
        .decode(tx_hash.as_bytes())
        .map_err(|e| NodeError::Structural(format!("Invalid transaction hash encoding: {e}")))?;
    Ok(Message::from_digest_slice(digest.as_slice())?)
}
