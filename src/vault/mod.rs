//! Vault domain state: addresses, multisig configuration, transaction records and the store
pub mod address;
pub mod multisig;
pub mod record;
pub mod store;

pub use address::Address;
pub use multisig::{derive_multisig_address, MultisigConfig};
pub use record::{ApprovalMap, BlockRef, TransactionRecord, TxStatus};
pub use store::{Contact, MergeSummary, VaultState, VaultStore};
