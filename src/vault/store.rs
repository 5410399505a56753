//! Vault state store
//!
//! One owned [`VaultState`] behind a `tokio::sync::watch` channel. Reads take a snapshot,
//! writes go through the mutation methods below and notify every subscriber. A failed mutation
//! leaves the state untouched. When opened with a path the state is written to disk as JSON
//! after every successful mutation.

use crate::{
	chain::storage::PendingMultisig,
	error::{Result, SignetError},
	vault::{
		address::Address,
		multisig::MultisigConfig,
		record::{TransactionRecord, TxStatus},
	},
};
use serde::{Deserialize, Serialize};
use sp_core::H256;
use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};
use tokio::sync::watch;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
	pub name: String,
	pub address: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
	/// Vaults by id
	pub multisigs: BTreeMap<String, MultisigConfig>,
	pub transactions: Vec<TransactionRecord>,
	pub address_book: Vec<Contact>,
	/// Persistent configuration drift notices by vault id
	pub drift_notices: BTreeMap<String, String>,
}

impl VaultState {
	pub fn transaction(&self, multisig_id: &str, hash: &H256) -> Option<&TransactionRecord> {
		self.transactions.iter().find(|t| t.multisig_id == multisig_id && t.hash == *hash)
	}

	pub fn transactions_with_status(
		&self,
		multisig_id: &str,
		status: TxStatus,
	) -> Vec<&TransactionRecord> {
		self.transactions
			.iter()
			.filter(|t| t.multisig_id == multisig_id && t.status == status)
			.collect()
	}
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
	version: u32,
	state: VaultState,
}

/// Counts of what a pending-set merge changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
	pub added: usize,
	pub updated: usize,
	pub closed: usize,
}

pub struct VaultStore {
	path: Option<PathBuf>,
	state: watch::Sender<VaultState>,
}

impl Default for VaultStore {
	fn default() -> Self {
		Self::in_memory()
	}
}

impl VaultStore {
	pub fn in_memory() -> Self {
		Self { path: None, state: watch::Sender::new(VaultState::default()) }
	}

	/// Open a persisted store, starting empty if the file does not exist yet.
	///
	/// Vaults whose stored multisig address no longer matches their signers get a drift notice.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let mut state = if path.exists() {
			let file: StoreFile = serde_json::from_slice(&fs::read(&path)?)?;
			if file.version != FILE_VERSION {
				return Err(SignetError::Serialization(format!(
					"unsupported store file version {} (expected {FILE_VERSION})",
					file.version
				)));
			}
			file.state
		} else {
			VaultState::default()
		};

		for (id, multisig) in &state.multisigs {
			if multisig.is_derivation_stale() {
				log::warn!("vault '{}' has a stale multisig address", multisig.name);
				state.drift_notices.insert(
					id.clone(),
					format!(
						"Stored multisig address of '{}' does not match its signers; reconfigure the vault",
						multisig.name
					),
				);
			}
		}

		Ok(Self { path: Some(path), state: watch::Sender::new(state) })
	}

	pub fn snapshot(&self) -> VaultState {
		self.state.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<VaultState> {
		self.state.subscribe()
	}

	pub fn with_state<T>(&self, func: impl FnOnce(&VaultState) -> T) -> T {
		func(&self.state.borrow())
	}

	pub fn multisig(&self, id: &str) -> Result<MultisigConfig> {
		self.with_state(|s| s.multisigs.get(id).cloned())
			.ok_or_else(|| SignetError::Generic(format!("unknown vault '{id}'")))
	}

	pub fn pending_transactions(&self, multisig_id: &str) -> Vec<TransactionRecord> {
		self.with_state(|s| {
			s.transactions_with_status(multisig_id, TxStatus::Pending).into_iter().cloned().collect()
		})
	}

	fn mutate<T>(&self, func: impl FnOnce(&mut VaultState) -> Result<T>) -> Result<T> {
		let mut outcome = None;
		self.state.send_if_modified(|state| {
			let mut next = state.clone();
			match func(&mut next) {
				Ok(value) => {
					let changed = next != *state;
					*state = next;
					outcome = Some(Ok(value));
					changed
				},
				Err(e) => {
					outcome = Some(Err(e));
					false
				},
			}
		});
		let value = outcome
			.ok_or_else(|| SignetError::Generic("store mutation did not run".to_string()))??;
		self.persist()?;
		Ok(value)
	}

	fn persist(&self) -> Result<()> {
		let Some(path) = &self.path else {
			return Ok(());
		};
		let bytes = {
			let state = self.state.borrow();
			serde_json::to_vec_pretty(&StoreFile { version: FILE_VERSION, state: state.clone() })?
		};
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, bytes)?;
		fs::rename(&tmp, path)?;
		Ok(())
	}

	// Multisigs

	pub fn upsert_multisig(&self, config: MultisigConfig) -> Result<()> {
		self.mutate(|state| {
			state.multisigs.insert(config.id.clone(), config);
			Ok(())
		})
	}

	pub fn remove_multisig(&self, id: &str) -> Result<()> {
		self.mutate(|state| {
			state
				.multisigs
				.remove(id)
				.ok_or_else(|| SignetError::Generic(format!("unknown vault '{id}'")))?;
			state.transactions.retain(|t| t.multisig_id != id);
			state.drift_notices.remove(id);
			Ok(())
		})
	}

	/// Apply a new signer set and threshold, re-deriving the multisig address
	pub fn update_multisig_config(
		&self,
		id: &str,
		signers: Vec<Address>,
		threshold: u16,
	) -> Result<MultisigConfig> {
		self.mutate(|state| {
			let config = state
				.multisigs
				.get_mut(id)
				.ok_or_else(|| SignetError::Generic(format!("unknown vault '{id}'")))?;
			config.set_config(signers, threshold)?;
			state.drift_notices.remove(id);
			Ok(config.clone())
		})
	}

	// Transactions

	/// Insert or replace a record, keyed by vault and hash
	pub fn upsert_transaction(&self, record: TransactionRecord) -> Result<()> {
		self.mutate(|state| {
			match state
				.transactions
				.iter_mut()
				.find(|t| t.multisig_id == record.multisig_id && t.hash == record.hash)
			{
				Some(existing) => *existing = record,
				None => state.transactions.push(record),
			}
			Ok(())
		})
	}

	pub fn update_transaction<T>(
		&self,
		multisig_id: &str,
		hash: &H256,
		func: impl FnOnce(&mut TransactionRecord) -> Result<T>,
	) -> Result<T> {
		self.mutate(|state| {
			let record = state
				.transactions
				.iter_mut()
				.find(|t| t.multisig_id == multisig_id && t.hash == *hash)
				.ok_or_else(|| {
					SignetError::Generic(format!("unknown transaction {hash:?} for '{multisig_id}'"))
				})?;
			func(record)
		})
	}

	/// Drafts can be deleted; anything on chain cannot
	pub fn delete_draft(&self, multisig_id: &str, hash: &H256) -> Result<()> {
		self.mutate(|state| {
			let position = state
				.transactions
				.iter()
				.position(|t| t.multisig_id == multisig_id && t.hash == *hash)
				.ok_or_else(|| SignetError::Generic(format!("unknown transaction {hash:?}")))?;
			if state.transactions[position].status != TxStatus::Draft {
				return Err(SignetError::Generic(
					"only draft transactions can be deleted".to_string(),
				));
			}
			state.transactions.remove(position);
			Ok(())
		})
	}

	/// Merge a freshly fetched on-chain pending set for one vault.
	///
	/// Known records take the fetched approvals, `new_records` are added, and pending records
	/// missing from the fetched set are closed.
	pub fn merge_pending(
		&self,
		multisig_id: &str,
		pending: &[PendingMultisig],
		new_records: Vec<TransactionRecord>,
	) -> Result<MergeSummary> {
		self.mutate(|state| {
			let mut summary = MergeSummary::default();
			for record in state.transactions.iter_mut().filter(|t| t.multisig_id == multisig_id) {
				match pending.iter().find(|p| p.call_hash == record.hash) {
					Some(entry) if record.is_open() => {
						record.mark_pending(entry);
						summary.updated += 1;
					},
					Some(_) => {},
					None if record.status == TxStatus::Pending => {
						record.mark_closed()?;
						summary.closed += 1;
					},
					None => {},
				}
			}
			for record in new_records {
				let known = state
					.transactions
					.iter()
					.any(|t| t.multisig_id == multisig_id && t.hash == record.hash);
				if !known {
					state.transactions.push(record);
					summary.added += 1;
				}
			}
			Ok(summary)
		})
	}

	// Address book

	pub fn add_contact(&self, contact: Contact) -> Result<()> {
		self.mutate(|state| {
			state.address_book.retain(|c| c.address != contact.address);
			state.address_book.push(contact);
			Ok(())
		})
	}

	pub fn remove_contact(&self, address: &Address) -> Result<()> {
		self.mutate(|state| {
			state.address_book.retain(|c| c.address != *address);
			Ok(())
		})
	}

	// Drift notices

	pub fn raise_drift(&self, multisig_id: &str, message: String) -> Result<()> {
		self.mutate(|state| {
			state.drift_notices.insert(multisig_id.to_string(), message);
			Ok(())
		})
	}

	pub fn clear_drift(&self, multisig_id: &str) -> Result<()> {
		self.mutate(|state| {
			state.drift_notices.remove(multisig_id);
			Ok(())
		})
	}

	pub fn drift_notice(&self, multisig_id: &str) -> Option<String> {
		self.with_state(|s| s.drift_notices.get(multisig_id).cloned())
	}
}
