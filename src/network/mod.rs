//! Peer-to-peer networking
//!
//! One persistent bidirectional TCP link per peer, carrying newline-framed
//! JSON messages. Three message kinds move blocks, whole chains and pool
//! candidates between nodes; fork resolution happens by answering a block
//! that does not extend the tip with our full chain.

pub mod message;
pub mod node;
pub mod peer;
pub mod server;

pub use message::Message;
pub use node::{Node, Reaction};
pub use peer::Peers;
pub use server::Server;
