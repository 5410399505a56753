/// Chain interaction module
///
/// This module provides functionality for:
/// - Resolving call indices from runtime metadata
/// - Encoding and decoding the calls the vault works with
/// - Reading multisig and proxy storage
/// - Fee estimation and extrinsic submission over RPC
/// - Reading dispatch results from block events
pub mod abi;
pub mod call;
pub mod calldata;
pub mod client;
pub mod events;
pub mod metadata;
pub mod storage;
pub mod tokens;
