//! Multisig approval orchestration
//!
//! Picks the multisig call for the next approval of a vault transaction, estimates its fee,
//! signs and submits it, and applies the outcome to the [`VaultStore`]. Local state only
//! changes once the node reports a successful dispatch.

use crate::{
	chain::{
		call::{Call, CallCodec, MultisigCall, Timepoint, Weight},
		client::{ChainClient, ExtrinsicSigner, SubmittedExtrinsic},
		events::DispatchOutcome,
		metadata::CallIndexTable,
	},
	config::AccountKind,
	decoders::TransactionKind,
	error::{Result, SignetError},
	log_verbose,
	vault::{
		address::Address,
		multisig::MultisigConfig,
		record::{BlockRef, TransactionRecord, TxStatus},
		store::VaultStore,
	},
};
use serde::Serialize;
use sp_core::H256;
use std::{collections::HashSet, fmt, sync::Mutex};

/// The multisig pallet call used for an approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MultisigAction {
	/// Register one more approval
	ApproveAsMulti,
	/// Final approval: approve and dispatch the call
	AsMulti,
	/// Single-signer vault: every approval dispatches immediately
	AsMultiThreshold1,
}

impl MultisigAction {
	pub fn executes(&self) -> bool {
		!matches!(self, MultisigAction::ApproveAsMulti)
	}
}

impl fmt::Display for MultisigAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MultisigAction::ApproveAsMulti => write!(f, "approveAsMulti"),
			MultisigAction::AsMulti => write!(f, "asMulti"),
			MultisigAction::AsMultiThreshold1 => write!(f, "asMultiThreshold1"),
		}
	}
}

/// Whether the next approval reaches the threshold
pub fn ready_to_execute(approvals: usize, threshold: u16) -> bool {
	approvals + 1 >= threshold as usize
}

pub fn select_action(approvals: usize, threshold: u16) -> MultisigAction {
	if threshold <= 1 {
		MultisigAction::AsMultiThreshold1
	} else if ready_to_execute(approvals, threshold) {
		MultisigAction::AsMulti
	} else {
		MultisigAction::ApproveAsMulti
	}
}

/// A signed-ready multisig call for one approval
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalPlan {
	pub action: MultisigAction,
	/// Canonical hash of the proxy-wrapped call
	pub call_hash: H256,
	pub call: Call,
	#[serde(with = "crate::chain::call::hex_bytes")]
	pub call_data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
	pub action: MultisigAction,
	pub partial_fee: u128,
	pub weight: Weight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalOutcome {
	pub action: MultisigAction,
	pub block: BlockRef,
	pub executed: bool,
}

/// Included is not enough: the dispatch itself must have succeeded
fn ensure_dispatched(what: &str, submitted: &SubmittedExtrinsic) -> Result<()> {
	match &submitted.outcome {
		DispatchOutcome::Success => Ok(()),
		DispatchOutcome::Failed(reason) => Err(SignetError::SubmissionFailure(format!(
			"{what} failed in block #{}: {reason}",
			submitted.block_number
		))),
	}
}

/// Clears the in-flight flag when an approval finishes, however it ends
struct InFlight<'a> {
	set: &'a Mutex<HashSet<H256>>,
	hash: H256,
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		if let Ok(mut set) = self.set.lock() {
			set.remove(&self.hash);
		}
	}
}

pub struct MultisigOrchestrator<'a, C: ChainClient> {
	client: &'a C,
	store: &'a VaultStore,
	codec: CallCodec<'a>,
	in_flight: Mutex<HashSet<H256>>,
}

impl<'a, C: ChainClient> MultisigOrchestrator<'a, C> {
	pub fn new(
		client: &'a C,
		store: &'a VaultStore,
		table: &'a CallIndexTable,
		account_kind: AccountKind,
	) -> Self {
		Self {
			client,
			store,
			codec: CallCodec::new(table, account_kind),
			in_flight: Mutex::new(HashSet::new()),
		}
	}

	fn record(&self, vault_id: &str, hash: &H256) -> Result<TransactionRecord> {
		self.store
			.with_state(|s| s.transaction(vault_id, hash).cloned())
			.ok_or_else(|| SignetError::Generic(format!("unknown transaction {hash:?}")))
	}

	/// Pending calls on chain, other than `record`, that block a ChangeConfig approval.
	///
	/// Reads the live pending set; only other ChangeConfig transactions are tolerated.
	pub async fn change_config_blockers(
		&self,
		vault: &MultisigConfig,
		record: &TransactionRecord,
	) -> Result<Vec<H256>> {
		let live = self.client.pending_multisigs(&vault.multisig_address()).await?;
		let blockers = self.store.with_state(|state| {
			live.iter()
				.map(|p| p.call_hash)
				.filter(|hash| *hash != record.hash)
				.filter(|hash| {
					!state
						.transaction(&vault.id, hash)
						.is_some_and(|other| other.kind.is_change_config())
				})
				.collect()
		});
		Ok(blockers)
	}

	/// Build the multisig call `signer` should submit next for `record`
	pub async fn plan(
		&self,
		vault: &MultisigConfig,
		record: &TransactionRecord,
		signer: &Address,
	) -> Result<ApprovalPlan> {
		if !record.is_open() {
			return Err(SignetError::Generic(format!(
				"transaction is {:?} and cannot be approved",
				record.status
			)));
		}
		if !record.approvals.contains(signer) {
			return Err(SignetError::Generic(format!(
				"{} cannot approve this transaction",
				signer.to_pub_key()
			)));
		}
		if record.approvals.has_approved(signer) {
			return Err(SignetError::Generic("already approved by this signer".to_string()));
		}
		if record.kind.is_change_config() {
			let blockers = self.change_config_blockers(vault, record).await?;
			if !blockers.is_empty() {
				return Err(SignetError::Generic(format!(
					"{} other pending transaction(s) must be resolved before changing the configuration",
					blockers.len()
				)));
			}
		}

		let proxy_call = self.codec.decode(&record.call_data)?;
		let other_signatories = vault.other_signatories(signer)?;
		let threshold = vault.threshold();
		let action = select_action(record.approvals.approved_count(), threshold);
		log_verbose!(
			"🧮 {} of {} approvals, next call: {}",
			record.approvals.approved_count(),
			threshold,
			action
		);

		let call = match action {
			MultisigAction::AsMultiThreshold1 => Call::Multisig(MultisigCall::AsMultiThreshold1 {
				other_signatories,
				call: Box::new(proxy_call),
			}),
			MultisigAction::AsMulti => {
				let max_weight = self.client.query_call_info(&record.call_data).await?.weight;
				Call::Multisig(MultisigCall::AsMulti {
					threshold,
					other_signatories,
					maybe_timepoint: record.timepoint,
					call: Box::new(proxy_call),
					max_weight,
				})
			},
			MultisigAction::ApproveAsMulti => Call::Multisig(MultisigCall::ApproveAsMulti {
				threshold,
				other_signatories,
				maybe_timepoint: record.timepoint,
				call_hash: record.hash,
				max_weight: Weight::default(),
			}),
		};
		let call_data = self.codec.encode(&call)?;
		Ok(ApprovalPlan { action, call_hash: record.hash, call, call_data })
	}

	pub async fn estimate_fee(&self, plan: &ApprovalPlan) -> Result<FeeEstimate> {
		let info = self.client.query_call_info(&plan.call_data).await?;
		Ok(FeeEstimate { action: plan.action, partial_fee: info.partial_fee, weight: info.weight })
	}

	/// Check the proxied account is still controlled by the vault's multisig
	pub async fn verify_proxy_relationship(&self, vault: &MultisigConfig) -> Result<()> {
		let delegates = self.client.proxy_delegates(&vault.proxied()).await?;
		if let Err(err) = vault.check_proxy_relationship(&delegates) {
			if let SignetError::ConfigDriftDetected(message) = &err {
				self.store.raise_drift(&vault.id, message.clone())?;
			}
			return Err(err);
		}
		Ok(())
	}

	/// Sign and submit the next approval of a transaction.
	///
	/// Only one approval per transaction can be in flight. A dismissed signing prompt comes back
	/// as [`SignetError::SigningCancelled`] and leaves the record unchanged.
	pub async fn approve<S: ExtrinsicSigner>(
		&self,
		vault_id: &str,
		hash: &H256,
		signer: &S,
	) -> Result<ApprovalOutcome> {
		let _guard = self.begin(*hash)?;
		let vault = self.store.multisig(vault_id)?;
		let record = self.record(vault_id, hash)?;
		let me = signer.address();

		self.verify_proxy_relationship(&vault).await?;
		let plan = self.plan(&vault, &record, &me).await?;
		let signed = signer.sign(&plan.call_data).await?;
		let submitted = self.client.submit_extrinsic(&signed).await?;
		ensure_dispatched(&plan.action.to_string(), &submitted)?;
		let block = BlockRef {
			block_number: submitted.block_number,
			extrinsic_index: submitted.extrinsic_index,
			call_hash: record.hash,
		};
		log_verbose!(
			"📦 {} included in block #{} (extrinsic {})",
			plan.action,
			block.block_number,
			block.extrinsic_index
		);

		if plan.action.executes() {
			self.store.update_transaction(vault_id, hash, |r| {
				r.approvals.approve(&me)?;
				r.mark_executed(block)
			})?;
			self.apply_executed_config(&vault, &record.kind)?;
		} else {
			let at = Timepoint { height: block.block_number, index: block.extrinsic_index };
			self.store.update_transaction(vault_id, hash, |r| r.apply_approval(&me, at))?;
		}

		Ok(ApprovalOutcome { action: plan.action, block, executed: plan.action.executes() })
	}

	/// Reject a pending transaction. Only its depositor can do this.
	pub async fn cancel<S: ExtrinsicSigner>(
		&self,
		vault_id: &str,
		hash: &H256,
		signer: &S,
	) -> Result<BlockRef> {
		let _guard = self.begin(*hash)?;
		let vault = self.store.multisig(vault_id)?;
		let record = self.record(vault_id, hash)?;
		let me = signer.address();

		let timepoint = match (record.status, record.timepoint) {
			(TxStatus::Pending, Some(timepoint)) => timepoint,
			_ => return Err(SignetError::Generic("only pending transactions can be cancelled".into())),
		};
		if record.depositor != Some(me) {
			return Err(SignetError::Generic(
				"only the signer who submitted the transaction can cancel it".to_string(),
			));
		}

		let call = Call::Multisig(MultisigCall::CancelAsMulti {
			threshold: vault.threshold(),
			other_signatories: vault.other_signatories(&me)?,
			timepoint,
			call_hash: record.hash,
		});
		let signed = signer.sign(&self.codec.encode(&call)?).await?;
		let submitted = self.client.submit_extrinsic(&signed).await?;
		ensure_dispatched("cancelAsMulti", &submitted)?;
		self.store.update_transaction(vault_id, hash, |r| r.mark_cancelled())?;
		Ok(BlockRef {
			block_number: submitted.block_number,
			extrinsic_index: submitted.extrinsic_index,
			call_hash: record.hash,
		})
	}

	fn begin(&self, hash: H256) -> Result<InFlight<'_>> {
		let mut set = self
			.in_flight
			.lock()
			.map_err(|_| SignetError::Generic("approval tracker poisoned".to_string()))?;
		if !set.insert(hash) {
			return Err(SignetError::Generic(
				"an approval for this transaction is already in progress".to_string(),
			));
		}
		Ok(InFlight { set: &self.in_flight, hash })
	}

	/// After a ChangeConfig executes, switch the cached vault to the new signers
	fn apply_executed_config(&self, vault: &MultisigConfig, kind: &TransactionKind) -> Result<()> {
		let TransactionKind::ChangeConfig { new_multisig, proposed } = kind else {
			return Ok(());
		};
		match proposed {
			Some(config) => {
				let updated = self.store.update_multisig_config(
					&vault.id,
					config.signers.clone(),
					config.threshold,
				)?;
				log_verbose!("🔁 Vault '{}' now controlled by {}", vault.name, updated.multisig_address());
			},
			None => self.store.raise_drift(
				&vault.id,
				format!(
					"Vault '{}' is now controlled by {}; its signers are unknown, reconfigure the vault",
					vault.name,
					new_multisig.to_pub_key()
				),
			)?,
		}
		Ok(())
	}
}
