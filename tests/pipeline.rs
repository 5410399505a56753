//! End-to-end vault pipeline against an in-memory chain
//!
//! Covers decoding pasted call data, the approval sequence of a 2-of-3 vault, configuration
//! changes, cancelled signing prompts, configuration drift, pending-set polling and the
//! background poller on a paused clock.

use signet_vault::{
	chain::{
		abi::AbiRegistry,
		call::{BalancesCall, Call, CallCodec, MultisigCall, StakingCall, Timepoint, Weight},
		calldata::wrap_in_proxy_call,
		client::{CallInfo, ChainClient, ExtrinsicSigner, SubmittedExtrinsic},
		events::DispatchOutcome,
		metadata::CallIndexTable,
		storage::{PendingMultisig, ProxyDefinition},
		tokens::TokenRegistry,
	},
	config::{AccountKind, ChainSpec, PollingConfig},
	decoders::{
		build_change_config, decode_transaction, decode_transaction_bytes, default_decoders,
		DecodedTransaction, TransactionKind, TxMetadata, VaultContext,
	},
	orchestrator::{MultisigAction, MultisigOrchestrator},
	sync::{spawn_pending_poller, sync_pending, ChainContext, KnownCalls},
	vault::{Address, MultisigConfig, TransactionRecord, TxStatus, VaultStore},
	Error,
};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;
use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

const DOT: u128 = 10_000_000_000;

fn account(seed: u8) -> Address {
	Address::Substrate([seed; 32])
}

fn vault() -> MultisigConfig {
	MultisigConfig::new(
		"v1",
		"Treasury",
		"polkadot",
		vec![account(1), account(2), account(3)],
		2,
		account(50),
	)
	.unwrap()
}

/// Chain double: pending set and proxies are set by the test, submissions are recorded
struct MockChain {
	pending: Mutex<Vec<PendingMultisig>>,
	delegates: Mutex<Vec<ProxyDefinition>>,
	nominated: Mutex<Vec<Address>>,
	submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockChain {
	fn controlled_by(multisig: Address) -> Self {
		Self {
			pending: Mutex::new(Vec::new()),
			delegates: Mutex::new(vec![ProxyDefinition { delegate: multisig, proxy_type: 0, delay: 0 }]),
			nominated: Mutex::new(Vec::new()),
			submitted: Mutex::new(Vec::new()),
		}
	}

	fn set_pending(&self, pending: Vec<PendingMultisig>) {
		*self.pending.lock().unwrap() = pending;
	}

	fn last_submitted(&self) -> Vec<u8> {
		self.submitted.lock().unwrap().last().cloned().unwrap()
	}
}

impl ChainClient for MockChain {
	async fn pending_multisigs(&self, _multisig: &Address) -> signet_vault::Result<Vec<PendingMultisig>> {
		Ok(self.pending.lock().unwrap().clone())
	}

	async fn proxy_delegates(&self, _proxied: &Address) -> signet_vault::Result<Vec<ProxyDefinition>> {
		Ok(self.delegates.lock().unwrap().clone())
	}

	async fn nominations(&self, _stash: &Address) -> signet_vault::Result<Vec<Address>> {
		Ok(self.nominated.lock().unwrap().clone())
	}

	async fn query_call_info(&self, _call: &[u8]) -> signet_vault::Result<CallInfo> {
		Ok(CallInfo {
			weight: Weight { ref_time: 1_000_000, proof_size: 4_096 },
			class: 0,
			partial_fee: 150_000_000,
		})
	}

	async fn submit_extrinsic(&self, extrinsic: &[u8]) -> signet_vault::Result<SubmittedExtrinsic> {
		let mut submitted = self.submitted.lock().unwrap();
		submitted.push(extrinsic.to_vec());
		Ok(SubmittedExtrinsic {
			block_hash: H256::repeat_byte(0xbb),
			block_number: 100 + submitted.len() as u32,
			extrinsic_index: 2,
			extrinsic_hash: H256(blake2_256(extrinsic)),
			outcome: DispatchOutcome::Success,
		})
	}
}

/// Signer double: "signs" by returning the call bytes unchanged
struct MockSigner {
	who: Address,
	cancel: bool,
}

impl MockSigner {
	fn new(seed: u8) -> Self {
		Self { who: account(seed), cancel: false }
	}
}

impl ExtrinsicSigner for MockSigner {
	fn address(&self) -> Address {
		self.who
	}

	async fn sign(&self, call: &[u8]) -> signet_vault::Result<Vec<u8>> {
		if self.cancel {
			return Err(Error::SigningCancelled);
		}
		Ok(call.to_vec())
	}
}

struct Env {
	table: CallIndexTable,
	tokens: TokenRegistry,
	abis: AbiRegistry,
	vault: MultisigConfig,
}

impl Env {
	fn new() -> Self {
		Self {
			table: CallIndexTable::polkadot(),
			tokens: TokenRegistry::from_chain(&ChainSpec::polkadot()),
			abis: AbiRegistry::new(),
			vault: vault(),
		}
	}

	fn codec(&self) -> CallCodec<'_> {
		CallCodec::new(&self.table, AccountKind::Substrate)
	}

	fn decode(&self, call: Call, metadata: Option<&TxMetadata>) -> DecodedTransaction {
		let ctx = VaultContext {
			codec: self.codec(),
			multisig: &self.vault,
			tokens: &self.tokens,
			abis: &self.abis,
			current_nominations: None,
			ss58_prefix: 0,
		};
		let bytes = self.codec().encode(&wrap_in_proxy_call(self.vault.proxied(), call)).unwrap();
		decode_transaction_bytes(&ctx, &default_decoders(), bytes, metadata).unwrap()
	}
}

fn transfer() -> Call {
	Call::Balances(BalancesCall::TransferKeepAlive { dest: account(60), value: 5 * DOT })
}

fn pending_entry(hash: H256, depositor: Address, at: Timepoint) -> PendingMultisig {
	PendingMultisig { call_hash: hash, when: at, deposit: DOT, depositor, approvals: vec![depositor] }
}

#[test]
fn pasted_call_data_is_decoded_and_classified() {
	let env = Env::new();
	let ctx = VaultContext {
		codec: env.codec(),
		multisig: &env.vault,
		tokens: &env.tokens,
		abis: &env.abis,
		current_nominations: None,
		ss58_prefix: 0,
	};
	let wrapped = env.codec().encode(&wrap_in_proxy_call(env.vault.proxied(), transfer())).unwrap();
	let hex_data = format!("0x{}", hex::encode(&wrapped));

	let decoded = decode_transaction(&ctx, &default_decoders(), &hex_data, None).unwrap();
	assert!(matches!(decoded.kind, TransactionKind::Transfer(_)));
	assert!(decoded.description.starts_with("Send 5 DOT to "));
	assert_eq!(decoded.hash, H256(blake2_256(&wrapped)));

	let garbage = decode_transaction(&ctx, &default_decoders(), "0xff00ff", None);
	assert!(matches!(garbage, Err(Error::InvalidCalldata { .. })));

	let foreign = env.codec().encode(&wrap_in_proxy_call(account(77), transfer())).unwrap();
	let not_ours =
		decode_transaction(&ctx, &default_decoders(), &format!("0x{}", hex::encode(foreign)), None);
	assert!(matches!(not_ours, Err(Error::NotOurs(_))));
}

#[tokio::test]
async fn two_of_three_vault_approves_then_executes() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(transfer(), None);
	store.upsert_transaction(TransactionRecord::draft(&decoded, &env.vault, None)).unwrap();

	let chain = MockChain::controlled_by(env.vault.multisig_address());
	let orchestrator =
		MultisigOrchestrator::new(&chain, &store, &env.table, AccountKind::Substrate);

	// First approval only registers the call hash.
	let first = orchestrator.approve("v1", &decoded.hash, &MockSigner::new(1)).await.unwrap();
	assert_eq!(first.action, MultisigAction::ApproveAsMulti);
	assert!(!first.executed);

	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.status, TxStatus::Pending);
	assert_eq!(record.depositor, Some(account(1)));
	let timepoint = Timepoint { height: first.block.block_number, index: first.block.extrinsic_index };
	assert_eq!(record.timepoint, Some(timepoint));

	match env.codec().decode(&chain.last_submitted()).unwrap() {
		Call::Multisig(MultisigCall::ApproveAsMulti { call_hash, maybe_timepoint, .. }) => {
			assert_eq!(call_hash, decoded.hash);
			assert_eq!(maybe_timepoint, None);
		},
		other => panic!("unexpected call {}", other.name()),
	}

	// Approving twice from the same signer is refused before anything is signed.
	assert!(orchestrator.approve("v1", &decoded.hash, &MockSigner::new(1)).await.is_err());

	chain.set_pending(vec![pending_entry(decoded.hash, account(1), timepoint)]);

	let vault = store.multisig("v1").unwrap();
	let plan = orchestrator.plan(&vault, &record, &account(2)).await.unwrap();
	assert_eq!(plan.action, MultisigAction::AsMulti);
	let fee = orchestrator.estimate_fee(&plan).await.unwrap();
	assert_eq!(fee.partial_fee, 150_000_000);

	let second = orchestrator.approve("v1", &decoded.hash, &MockSigner::new(2)).await.unwrap();
	assert_eq!(second.action, MultisigAction::AsMulti);
	assert!(second.executed);

	match env.codec().decode(&chain.last_submitted()).unwrap() {
		Call::Multisig(MultisigCall::AsMulti { threshold, other_signatories, maybe_timepoint, call, .. }) => {
			assert_eq!(threshold, 2);
			assert_eq!(other_signatories, vec![account(1), account(3)]);
			assert_eq!(maybe_timepoint, Some(timepoint));
			assert_eq!(*call, decoded.call);
		},
		other => panic!("unexpected call {}", other.name()),
	}

	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.status, TxStatus::Executed);
	assert_eq!(record.approvals.approved_count(), 2);
	assert_eq!(record.execution.unwrap().block_number, second.block.block_number);
}

#[tokio::test]
async fn cancelled_signing_leaves_record_untouched() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(transfer(), None);
	store.upsert_transaction(TransactionRecord::draft(&decoded, &env.vault, None)).unwrap();

	let chain = MockChain::controlled_by(env.vault.multisig_address());
	let orchestrator =
		MultisigOrchestrator::new(&chain, &store, &env.table, AccountKind::Substrate);

	let signer = MockSigner { who: account(1), cancel: true };
	let err = orchestrator.approve("v1", &decoded.hash, &signer).await.unwrap_err();
	assert!(err.is_user_cancellation());
	assert!(err.user_message().is_none());
	assert!(chain.submitted.lock().unwrap().is_empty());

	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.status, TxStatus::Draft);

	// The in-flight flag was released, so a retry goes through.
	let retry = orchestrator.approve("v1", &decoded.hash, &MockSigner::new(1)).await.unwrap();
	assert_eq!(retry.action, MultisigAction::ApproveAsMulti);
}

#[tokio::test]
async fn change_config_waits_for_other_pending_and_updates_vault() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();

	let new_signers = vec![account(1), account(2), account(4)];
	let (call, metadata) = build_change_config(&env.vault, new_signers.clone(), 2).unwrap();
	let change = env.decode(call, Some(&metadata));
	assert!(change.kind.is_change_config());
	store.upsert_transaction(TransactionRecord::draft(&change, &env.vault, None)).unwrap();

	let chain = MockChain::controlled_by(env.vault.multisig_address());
	let orchestrator =
		MultisigOrchestrator::new(&chain, &store, &env.table, AccountKind::Substrate);

	// An unrelated transfer pending on chain blocks the configuration change.
	let transfer_hash = env.decode(transfer(), None).hash;
	chain.set_pending(vec![pending_entry(
		transfer_hash,
		account(3),
		Timepoint { height: 90, index: 1 },
	)]);
	assert!(orchestrator.approve("v1", &change.hash, &MockSigner::new(1)).await.is_err());

	chain.set_pending(Vec::new());
	let first = orchestrator.approve("v1", &change.hash, &MockSigner::new(1)).await.unwrap();
	let timepoint = Timepoint { height: first.block.block_number, index: first.block.extrinsic_index };
	chain.set_pending(vec![pending_entry(change.hash, account(1), timepoint)]);

	let second = orchestrator.approve("v1", &change.hash, &MockSigner::new(2)).await.unwrap();
	assert!(second.executed);

	let updated = store.multisig("v1").unwrap();
	assert_eq!(updated.signers(), new_signers.as_slice());
	assert_eq!(updated.threshold(), 2);
	assert_ne!(updated.multisig_address(), env.vault.multisig_address());
	assert!(store.drift_notice("v1").is_none());
}

#[tokio::test]
async fn lost_proxy_raises_drift_notice() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(transfer(), None);
	store.upsert_transaction(TransactionRecord::draft(&decoded, &env.vault, None)).unwrap();

	let chain = MockChain::controlled_by(account(99));
	let orchestrator =
		MultisigOrchestrator::new(&chain, &store, &env.table, AccountKind::Substrate);

	let err = orchestrator.approve("v1", &decoded.hash, &MockSigner::new(1)).await.unwrap_err();
	assert!(matches!(err, Error::ConfigDriftDetected(_)));
	assert!(store.drift_notice("v1").is_some());
	assert!(chain.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn polling_adds_known_pending_and_closes_vanished() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(transfer(), None);

	let chain = MockChain::controlled_by(env.vault.multisig_address());
	let context = ChainContext::new(&ChainSpec::polkadot(), CallIndexTable::polkadot()).unwrap();
	let mut known = KnownCalls::new();
	let unknown_hash = H256::repeat_byte(0x42);
	chain.set_pending(vec![
		pending_entry(decoded.hash, account(2), Timepoint { height: 7, index: 0 }),
		pending_entry(unknown_hash, account(3), Timepoint { height: 8, index: 0 }),
	]);

	// Nothing is known yet, so nothing is added.
	let summary = sync_pending(&chain, &store, &context, &known, "v1").await.unwrap();
	assert_eq!(summary.added, 0);

	assert_eq!(known.insert(decoded.call_data.clone(), None), decoded.hash);
	let summary = sync_pending(&chain, &store, &context, &known, "v1").await.unwrap();
	assert_eq!(summary.added, 1);
	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.status, TxStatus::Pending);
	assert_eq!(record.depositor, Some(account(2)));
	assert!(record.approvals.has_approved(&account(2)));

	chain.set_pending(Vec::new());
	let summary = sync_pending(&chain, &store, &context, &known, "v1").await.unwrap();
	assert_eq!(summary.closed, 1);
	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.status, TxStatus::Closed);

	// A broken proxy relationship is reported but polling continues.
	*chain.delegates.lock().unwrap() = Vec::new();
	sync_pending(&chain, &store, &context, &known, "v1").await.unwrap();
	assert!(store.drift_notice("v1").is_some());
}

#[tokio::test]
async fn polled_nomination_is_compared_with_current_targets() {
	let env = Env::new();
	let store = VaultStore::in_memory();
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(
		Call::Staking(StakingCall::Nominate { targets: vec![account(71), account(72)] }),
		None,
	);

	let chain = MockChain::controlled_by(env.vault.multisig_address());
	*chain.nominated.lock().unwrap() = vec![account(70), account(71)];
	chain.set_pending(vec![pending_entry(decoded.hash, account(1), Timepoint { height: 3, index: 1 })]);

	let context = ChainContext::new(&ChainSpec::polkadot(), CallIndexTable::polkadot()).unwrap();
	let mut known = KnownCalls::new();
	known.insert(decoded.call_data.clone(), None);
	sync_pending(&chain, &store, &context, &known, "v1").await.unwrap();

	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	match record.kind {
		TransactionKind::NominateFromStaking { validators, diff: Some(diff) } => {
			assert_eq!(validators, vec![account(71), account(72)]);
			assert_eq!(diff.added, vec![account(72)]);
			assert_eq!(diff.removed, vec![account(70)]);
			assert_eq!(diff.kept, vec![account(71)]);
		},
		other => panic!("unexpected kind {}", other.name()),
	}
}

#[tokio::test(start_paused = true)]
async fn background_poller_follows_the_pending_set() {
	let env = Env::new();
	let store = Arc::new(VaultStore::in_memory());
	store.upsert_multisig(env.vault.clone()).unwrap();
	let decoded = env.decode(transfer(), None);
	store.upsert_transaction(TransactionRecord::draft(&decoded, &env.vault, None)).unwrap();

	let chain = Arc::new(MockChain::controlled_by(env.vault.multisig_address()));
	chain.set_pending(vec![pending_entry(decoded.hash, account(3), Timepoint { height: 12, index: 2 })]);
	let context =
		Arc::new(ChainContext::new(&ChainSpec::polkadot(), CallIndexTable::polkadot()).unwrap());

	let poller = spawn_pending_poller(
		chain.clone(),
		store.clone(),
		None,
		context,
		"v1".to_string(),
		PollingConfig { pending_secs: 5, metadata_secs: 60 },
	);
	let status = || store.snapshot().transaction("v1", &decoded.hash).unwrap().status;

	// Both timers fire at once: the local draft becomes known, then matches the pending entry.
	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(status(), TxStatus::Pending);
	let record = store.snapshot().transaction("v1", &decoded.hash).cloned().unwrap();
	assert_eq!(record.depositor, Some(account(3)));

	chain.set_pending(Vec::new());
	tokio::time::sleep(Duration::from_secs(3)).await;
	assert_eq!(status(), TxStatus::Pending);

	tokio::time::sleep(Duration::from_secs(2)).await;
	assert_eq!(status(), TxStatus::Closed);

	poller.abort();
}
