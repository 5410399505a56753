//! Transaction records and approval tracking

use crate::{
	chain::{call::Timepoint, storage::PendingMultisig},
	decoders::{DecodedTransaction, TransactionKind},
	error::{Result, SignetError},
	vault::{address::Address, multisig::MultisigConfig},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sp_core::H256;
use std::collections::BTreeMap;

/// Which signers have approved, keyed by public key hex.
///
/// The key set is the signer set when the transaction was created and never changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalMap(BTreeMap<String, bool>);

impl ApprovalMap {
	pub fn new(signers: &[Address]) -> Self {
		Self(signers.iter().map(|s| (s.to_pub_key(), false)).collect())
	}

	pub fn approve(&mut self, signer: &Address) -> Result<()> {
		match self.0.get_mut(&signer.to_pub_key()) {
			Some(approved) => {
				*approved = true;
				Ok(())
			},
			None => Err(SignetError::Generic(format!(
				"{} was not a signer when this transaction was created",
				signer.to_pub_key()
			))),
		}
	}

	/// Replace approvals with the on-chain list; unknown accounts are ignored
	pub fn sync_from_chain(&mut self, approvals: &[Address]) {
		let approved: Vec<String> = approvals.iter().map(Address::to_pub_key).collect();
		for (key, value) in self.0.iter_mut() {
			*value = approved.contains(key);
		}
	}

	pub fn has_approved(&self, signer: &Address) -> bool {
		self.0.get(&signer.to_pub_key()).copied().unwrap_or(false)
	}

	pub fn approved_count(&self) -> usize {
		self.0.values().filter(|v| **v).count()
	}

	pub fn contains(&self, signer: &Address) -> bool {
		self.0.contains_key(&signer.to_pub_key())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
		self.0.iter().map(|(k, v)| (k.as_str(), *v))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
	/// Off-chain only
	Draft,
	/// On chain, awaiting approvals
	Pending,
	Executed,
	/// Rejected by its depositor
	Cancelled,
	/// Left the on-chain pending set without being seen to execute
	Closed,
}

/// Where an approval or execution landed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
	pub block_number: u32,
	pub extrinsic_index: u32,
	pub call_hash: H256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
	pub hash: H256,
	#[serde(with = "crate::chain::call::hex_bytes")]
	pub call_data: Vec<u8>,
	pub kind: TransactionKind,
	pub description: String,
	pub multisig_id: String,
	pub approvals: ApprovalMap,
	pub status: TxStatus,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub executed_at: Option<DateTime<Utc>>,
	/// First approval on chain
	#[serde(default)]
	pub timepoint: Option<Timepoint>,
	#[serde(default)]
	pub depositor: Option<Address>,
	/// Backend id of whoever created the draft; kept after promotion
	#[serde(default)]
	pub created_by: Option<String>,
	#[serde(default)]
	pub execution: Option<BlockRef>,
}

impl TransactionRecord {
	/// A new off-chain draft with nobody approved yet
	pub fn draft(
		decoded: &DecodedTransaction,
		vault: &MultisigConfig,
		created_by: Option<String>,
	) -> Self {
		Self {
			hash: decoded.hash,
			call_data: decoded.call_data.clone(),
			kind: decoded.kind.clone(),
			description: decoded.description.clone(),
			multisig_id: vault.id.clone(),
			approvals: ApprovalMap::new(vault.signers()),
			status: TxStatus::Draft,
			created_at: Utc::now(),
			executed_at: None,
			timepoint: None,
			depositor: None,
			created_by,
			execution: None,
		}
	}

	/// A record for a call found pending on chain
	pub fn from_pending(
		decoded: &DecodedTransaction,
		vault: &MultisigConfig,
		pending: &PendingMultisig,
		created_by: Option<String>,
	) -> Self {
		let mut record = Self::draft(decoded, vault, created_by);
		record.mark_pending(pending);
		record
	}

	/// Move to (or refresh) `Pending` from the on-chain entry
	pub fn mark_pending(&mut self, pending: &PendingMultisig) {
		if matches!(self.status, TxStatus::Draft | TxStatus::Pending) {
			self.status = TxStatus::Pending;
		}
		self.timepoint = Some(pending.when);
		self.depositor = Some(pending.depositor);
		self.approvals.sync_from_chain(&pending.approvals);
	}

	/// Record a non-executing approval by `signer` that landed at `at`.
	/// The first approval puts a draft on chain, making `signer` its depositor.
	pub fn apply_approval(&mut self, signer: &Address, at: Timepoint) -> Result<()> {
		if !self.is_open() {
			return Err(SignetError::Generic(format!(
				"transaction {:?} is {:?} and cannot be approved",
				self.hash, self.status
			)));
		}
		self.approvals.approve(signer)?;
		if self.status == TxStatus::Draft {
			self.status = TxStatus::Pending;
			self.timepoint = Some(at);
			self.depositor = Some(*signer);
		}
		Ok(())
	}

	pub fn mark_executed(&mut self, execution: BlockRef) -> Result<()> {
		self.transition(&[TxStatus::Draft, TxStatus::Pending], TxStatus::Executed)?;
		self.execution = Some(execution);
		self.executed_at = Some(Utc::now());
		Ok(())
	}

	pub fn mark_cancelled(&mut self) -> Result<()> {
		self.transition(&[TxStatus::Pending], TxStatus::Cancelled)
	}

	pub fn mark_closed(&mut self) -> Result<()> {
		self.transition(&[TxStatus::Pending], TxStatus::Closed)
	}

	pub fn is_open(&self) -> bool {
		matches!(self.status, TxStatus::Draft | TxStatus::Pending)
	}

	fn transition(&mut self, from: &[TxStatus], to: TxStatus) -> Result<()> {
		if !from.contains(&self.status) {
			return Err(SignetError::Generic(format!(
				"transaction {:?} cannot move from {:?} to {:?}",
				self.hash, self.status, to
			)));
		}
		self.status = to;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn account(seed: u8) -> Address {
		Address::Substrate([seed; 32])
	}

	fn record() -> TransactionRecord {
		let vault = MultisigConfig::new(
			"v1",
			"Treasury",
			"polkadot",
			vec![account(1), account(2), account(3)],
			2,
			account(50),
		)
		.unwrap();
		let decoded = DecodedTransaction {
			hash: H256::repeat_byte(1),
			call_data: vec![1, 2, 3],
			call: crate::chain::call::Call::System(crate::chain::call::SystemCall::Remark {
				remark: vec![],
			}),
			inner: crate::chain::call::Call::System(crate::chain::call::SystemCall::Remark {
				remark: vec![],
			}),
			kind: TransactionKind::Advanced { section: "System".into(), method: "remark".into() },
			description: "System.remark".into(),
		};
		TransactionRecord::draft(&decoded, &vault, Some("user-7".into()))
	}

	#[test]
	fn test_approval_key_set_is_fixed() {
		let mut approvals = ApprovalMap::new(&[account(1), account(2)]);
		assert_eq!(approvals.approved_count(), 0);
		approvals.approve(&account(1)).unwrap();
		assert!(approvals.has_approved(&account(1)));
		assert!(approvals.approve(&account(9)).is_err());

		approvals.sync_from_chain(&[account(2), account(9)]);
		assert!(!approvals.has_approved(&account(1)));
		assert!(approvals.has_approved(&account(2)));
		assert_eq!(approvals.len(), 2);
	}

	#[test]
	fn test_draft_to_pending_to_executed() {
		let mut record = record();
		assert_eq!(record.status, TxStatus::Draft);
		assert!(record.mark_cancelled().is_err());

		record.mark_pending(&PendingMultisig {
			call_hash: record.hash,
			when: Timepoint { height: 10, index: 1 },
			deposit: 1,
			depositor: account(1),
			approvals: vec![account(1)],
		});
		assert_eq!(record.status, TxStatus::Pending);
		assert_eq!(record.approvals.approved_count(), 1);
		assert_eq!(record.created_by.as_deref(), Some("user-7"));

		record
			.mark_executed(BlockRef { block_number: 12, extrinsic_index: 2, call_hash: record.hash })
			.unwrap();
		assert_eq!(record.status, TxStatus::Executed);
		assert!(record.executed_at.is_some());
		assert!(record.mark_closed().is_err());
	}

	#[test]
	fn test_first_approval_promotes_draft() {
		let mut record = record();
		record.apply_approval(&account(2), Timepoint { height: 5, index: 3 }).unwrap();
		assert_eq!(record.status, TxStatus::Pending);
		assert_eq!(record.depositor, Some(account(2)));
		assert_eq!(record.timepoint, Some(Timepoint { height: 5, index: 3 }));

		record.apply_approval(&account(3), Timepoint { height: 9, index: 0 }).unwrap();
		assert_eq!(record.depositor, Some(account(2)));
		assert_eq!(record.approvals.approved_count(), 2);
		assert!(record.apply_approval(&account(8), Timepoint { height: 9, index: 0 }).is_err());
	}

	#[test]
	fn test_record_serde_roundtrip() {
		let record = record();
		let json = serde_json::to_string(&record).unwrap();
		let back: TransactionRecord = serde_json::from_str(&json).unwrap();
		assert_eq!(back, record);
	}
}
