//! # Signet Vault Library
//!
//! Core of a multisig vault for Substrate chains: addresses and multisig derivation, call
//! decoding and classification, multisig approval orchestration, and syncing with the chain
//! and the off-chain metadata backend.

pub mod backend;
pub mod chain;
pub mod cli;
pub mod config;
pub mod decoders;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod sync;
pub mod vault;

// Re-export commonly used types and functions
pub use error::{Result, SignetError as Error};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library version
pub fn version() -> &'static str {
	VERSION
}

/// Get the library name
pub fn name() -> &'static str {
	NAME
}
