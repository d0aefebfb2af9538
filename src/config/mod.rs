//! Configuration management
//!
//! This module handles basic configuration settings for the node,
//! including the listen port, the inbound peer cap and the mining cadence.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
