//! Wallet: the node's keypair and transaction building

pub mod wallet;

pub use wallet::Wallet;
