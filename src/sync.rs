//! Background polling of on-chain vault state
//!
//! Pending multisig entries and proxy relationships are refetched on a fixed interval and
//! merged into the [`VaultStore`]; each merge replaces what the previous poll saw. Call data
//! comes from local drafts and from the backend, whose drafts are promoted to saved metadata
//! once they reach the chain.

use crate::{
	backend::{BackendClient, PageParams, TxDraftRow, TxMetadataRow},
	chain::{
		abi::AbiRegistry,
		call::CallCodec,
		calldata::{parse_hex, unwrap_for_vault},
		client::ChainClient,
		metadata::CallIndexTable,
		tokens::TokenRegistry,
	},
	config::{AccountKind, ChainSpec, PollingConfig},
	decoders::{
		decode_transaction_bytes, nominating_account, DecodedTransaction, TxDecoder, TxMetadata,
		VaultContext,
	},
	error::{Result, SignetError},
	vault::{Address, MergeSummary, MultisigConfig, TransactionRecord, TxStatus, VaultStore},
};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;
use std::{
	collections::{hash_map::Entry, HashMap},
	sync::Arc,
};
use tokio::task::JoinHandle;

/// Call data known off chain, with whatever came with it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnownCall {
	pub call_data: Vec<u8>,
	pub metadata: Option<TxMetadata>,
	/// Backend user id of the creator
	pub created_by: Option<String>,
	/// Backend draft this call came from, until it is promoted
	pub draft_id: Option<String>,
}

/// Call data the vault knows about, keyed by canonical hash
#[derive(Clone, Debug, Default)]
pub struct KnownCalls {
	calls: HashMap<H256, KnownCall>,
}

impl KnownCalls {
	pub fn new() -> Self {
		Self::default()
	}

	/// Remember call data and its hints; returns the canonical hash
	pub fn insert(&mut self, call_data: Vec<u8>, metadata: Option<TxMetadata>) -> H256 {
		self.insert_call(KnownCall { call_data, metadata, ..Default::default() })
	}

	/// Add a call, filling in what an earlier source left out
	pub fn insert_call(&mut self, call: KnownCall) -> H256 {
		let hash = H256(blake2_256(&call.call_data));
		match self.calls.entry(hash) {
			Entry::Occupied(mut entry) => {
				let known = entry.get_mut();
				if call.metadata.is_some() {
					known.metadata = call.metadata;
				}
				if call.created_by.is_some() {
					known.created_by = call.created_by;
				}
				if call.draft_id.is_some() {
					known.draft_id = call.draft_id;
				}
			},
			Entry::Vacant(entry) => {
				entry.insert(call);
			},
		}
		hash
	}

	/// Add backend metadata rows, skipping rows whose call data is not hex
	pub fn extend_from_rows(&mut self, rows: &[TxMetadataRow]) {
		for row in rows {
			match parse_hex(&row.call_data) {
				Ok(call_data) => {
					self.insert_call(KnownCall {
						call_data,
						metadata: Some(row.hints()),
						created_by: row.created_by.clone(),
						draft_id: None,
					});
				},
				Err(e) => log::warn!("skipping metadata for {}: {e}", row.call_hash),
			}
		}
	}

	/// Add backend drafts, skipping drafts whose call data is not hex
	pub fn extend_from_drafts(&mut self, drafts: &[TxDraftRow]) {
		for draft in drafts {
			match parse_hex(&draft.call_data) {
				Ok(call_data) => {
					self.insert_call(KnownCall {
						call_data,
						metadata: Some(draft.hints()),
						created_by: draft.creator_id.clone(),
						draft_id: draft.id.clone(),
					});
				},
				Err(e) => log::warn!("skipping draft {:?}: {e}", draft.id),
			}
		}
	}

	pub fn get(&self, hash: &H256) -> Option<&KnownCall> {
		self.calls.get(hash)
	}

	/// Calls that still have a backend draft
	pub fn backend_drafts(&self) -> impl Iterator<Item = (H256, &str)> + '_ {
		self.calls
			.iter()
			.filter_map(|(hash, call)| call.draft_id.as_deref().map(|id| (*hash, id)))
	}

	fn clear_draft(&mut self, hash: &H256) {
		if let Some(call) = self.calls.get_mut(hash) {
			call.draft_id = None;
		}
	}

	pub fn len(&self) -> usize {
		self.calls.len()
	}

	pub fn is_empty(&self) -> bool {
		self.calls.is_empty()
	}
}

/// Chain context for decoding a vault's transactions
pub struct ChainContext {
	pub table: CallIndexTable,
	pub account_kind: AccountKind,
	pub tokens: TokenRegistry,
	pub abis: AbiRegistry,
	pub ss58_prefix: u16,
	pub decoders: Vec<Box<dyn TxDecoder>>,
}

impl ChainContext {
	/// Context for `chain`, with the contract ABIs its configuration lists
	pub fn new(chain: &ChainSpec, table: CallIndexTable) -> Result<Self> {
		let mut abis = AbiRegistry::new();
		for contract in &chain.contracts {
			let address = contract.address.as_deref().map(Address::from_ss58).transpose()?;
			abis.load_file(&contract.abi, address)?;
		}
		Ok(Self {
			table,
			account_kind: chain.account_kind,
			tokens: TokenRegistry::from_chain(chain),
			abis,
			ss58_prefix: chain.ss58_prefix,
			decoders: crate::decoders::default_decoders(),
		})
	}

	pub fn codec(&self) -> CallCodec<'_> {
		CallCodec::new(&self.table, self.account_kind)
	}

	/// Decode and classify proxy-wrapped call data for `vault`
	pub fn decode(
		&self,
		vault: &MultisigConfig,
		call_data: Vec<u8>,
		metadata: Option<&TxMetadata>,
		current_nominations: Option<&[Address]>,
	) -> Result<DecodedTransaction> {
		let ctx = VaultContext {
			codec: self.codec(),
			multisig: vault,
			tokens: &self.tokens,
			abis: &self.abis,
			current_nominations,
			ss58_prefix: self.ss58_prefix,
		};
		decode_transaction_bytes(&ctx, &self.decoders, call_data, metadata)
	}
}

/// Current nominations of whoever a nominate call acts for.
///
/// `None` when the call is not a nomination for this vault.
pub async fn current_nominations<C: ChainClient>(
	client: &C,
	chain: &ChainContext,
	vault: &MultisigConfig,
	call_data: &[u8],
) -> Result<Option<Vec<Address>>> {
	let nominator = {
		let Ok(call) = chain.codec().decode(call_data) else { return Ok(None) };
		let Ok(inner) = unwrap_for_vault(&call, &vault.proxied()) else { return Ok(None) };
		nominating_account(inner, &vault.proxied(), chain.account_kind)
	};
	match nominator {
		Some(account) => Ok(Some(client.nominations(&account).await?)),
		None => Ok(None),
	}
}

/// One poll: refresh proxy relationship and pending transactions of a vault.
///
/// A broken proxy relationship raises a drift notice but the pending set is still merged.
/// Pending entries whose call data is unknown are left out until it becomes known.
pub async fn sync_pending<C: ChainClient>(
	client: &C,
	store: &VaultStore,
	chain: &ChainContext,
	known: &KnownCalls,
	vault_id: &str,
) -> Result<MergeSummary> {
	let vault = store.multisig(vault_id)?;

	let delegates = client.proxy_delegates(&vault.proxied()).await?;
	if let Err(err) = vault.check_proxy_relationship(&delegates) {
		log::warn!("{err}");
		if let SignetError::ConfigDriftDetected(message) = err {
			store.raise_drift(vault_id, message)?;
		}
	}

	let pending = client.pending_multisigs(&vault.multisig_address()).await?;

	let snapshot = store.snapshot();
	let mut new_records = Vec::new();
	let mut attributions = Vec::new();
	for entry in &pending {
		let existing = snapshot.transaction(vault_id, &entry.call_hash);
		let Some(call) = known.get(&entry.call_hash) else {
			if existing.is_none() {
				log::debug!("no call data for pending {:?} yet", entry.call_hash);
			}
			continue;
		};
		if let Some(existing) = existing {
			if let (None, Some(creator)) = (&existing.created_by, &call.created_by) {
				attributions.push((entry.call_hash, creator.clone()));
			}
			continue;
		}

		let nominations = current_nominations(client, chain, &vault, &call.call_data)
			.await
			.unwrap_or_else(|e| {
				log::warn!("could not read current nominations: {e}");
				None
			});
		match chain.decode(&vault, call.call_data.clone(), call.metadata.as_ref(), nominations.as_deref()) {
			Ok(decoded) => new_records.push(TransactionRecord::from_pending(
				&decoded,
				&vault,
				entry,
				call.created_by.clone(),
			)),
			Err(SignetError::NotOurs(reason)) => {
				log::debug!("pending {:?} is not for this vault: {reason}", entry.call_hash)
			},
			Err(e) => log::warn!("could not decode pending {:?}: {e}", entry.call_hash),
		}
	}

	let summary = store.merge_pending(vault_id, &pending, new_records)?;
	for (hash, creator) in attributions {
		store.update_transaction(vault_id, &hash, |record| {
			record.created_by.get_or_insert(creator);
			Ok(())
		})?;
	}
	if summary != MergeSummary::default() {
		log::debug!(
			"vault '{vault_id}': {} added, {} updated, {} closed",
			summary.added,
			summary.updated,
			summary.closed
		);
	}
	Ok(summary)
}

/// Collect call data from local drafts and from the backend's drafts and metadata
pub async fn refresh_known_calls(
	backend: Option<&BackendClient>,
	store: &VaultStore,
	vault_id: &str,
	known: &mut KnownCalls,
) -> Result<()> {
	let drafts: Vec<KnownCall> = store.with_state(|state| {
		state
			.transactions_with_status(vault_id, TxStatus::Draft)
			.into_iter()
			.map(|t| KnownCall {
				call_data: t.call_data.clone(),
				created_by: t.created_by.clone(),
				..Default::default()
			})
			.collect()
	});
	for call in drafts {
		known.insert_call(call);
	}

	if let Some(backend) = backend {
		let page = || PageParams::new().with_limit(500);
		known.extend_from_drafts(&backend.list_drafts(vault_id, page()).await?);
		known.extend_from_rows(&backend.fetch_tx_metadata(vault_id, page()).await?);
	}
	Ok(())
}

/// Save a decoded transaction as a draft, locally and on the backend when there is one
pub async fn save_draft(
	backend: Option<&BackendClient>,
	store: &VaultStore,
	vault: &MultisigConfig,
	decoded: &DecodedTransaction,
	metadata: Option<&TxMetadata>,
	creator: Option<String>,
) -> Result<TransactionRecord> {
	if store.with_state(|s| s.transaction(&vault.id, &decoded.hash).is_some()) {
		return Err(SignetError::Generic(format!(
			"transaction {:?} is already known to vault '{}'",
			decoded.hash, vault.name
		)));
	}
	if let Some(backend) = backend {
		let row = TxDraftRow::new(&vault.id, &decoded.call_data, metadata, creator.clone());
		let saved = backend.insert_draft(&row).await?;
		log::debug!("backend draft {:?} saved for {:?}", saved.id, decoded.hash);
	}
	let record = TransactionRecord::draft(decoded, vault, creator);
	store.upsert_transaction(record.clone())?;
	Ok(record)
}

/// Turn backend drafts that reached the chain into saved metadata.
///
/// The metadata row keeps the draft's hints and creator; the draft is deleted afterwards.
/// Returns how many drafts were promoted.
pub async fn promote_drafts(
	backend: &BackendClient,
	store: &VaultStore,
	vault_id: &str,
	known: &mut KnownCalls,
) -> Result<usize> {
	let snapshot = store.snapshot();
	let ready: Vec<(H256, String)> = known
		.backend_drafts()
		.filter(|(hash, _)| {
			snapshot
				.transaction(vault_id, hash)
				.is_some_and(|record| record.status != TxStatus::Draft)
		})
		.map(|(hash, id)| (hash, id.to_string()))
		.collect();

	let mut promoted = 0;
	for (hash, draft_id) in ready {
		let Some(call) = known.get(&hash) else { continue };
		let row =
			TxMetadataRow::new(vault_id, &call.call_data, call.metadata.as_ref(), call.created_by.clone());
		backend.insert_tx_metadata(&row).await?;
		if !backend.delete_draft(&draft_id).await? {
			log::debug!("backend draft {draft_id} was already gone");
		}
		known.clear_draft(&hash);
		promoted += 1;
	}
	Ok(promoted)
}

/// Start polling one vault in the background until the handle is aborted.
///
/// Pending state is refreshed every `polling.pending_secs`, known call data every
/// `polling.metadata_secs`. Failures are logged and retried on the next tick.
pub fn spawn_pending_poller<C>(
	client: Arc<C>,
	store: Arc<VaultStore>,
	backend: Option<Arc<BackendClient>>,
	chain: Arc<ChainContext>,
	vault_id: String,
	polling: PollingConfig,
) -> JoinHandle<()>
where
	C: ChainClient + Send + Sync + 'static,
{
	tokio::spawn(async move {
		let mut known = KnownCalls::new();
		let mut pending_timer = tokio::time::interval(polling.pending_interval());
		let mut metadata_timer = tokio::time::interval(polling.metadata_interval());
		pending_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		metadata_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		log::info!(
			"polling vault '{vault_id}' every {:?} (metadata every {:?})",
			polling.pending_interval(),
			polling.metadata_interval()
		);

		loop {
			tokio::select! {
				biased;
				_ = metadata_timer.tick() => {
					if let Err(e) =
						refresh_known_calls(backend.as_deref(), &store, &vault_id, &mut known).await
					{
						log::warn!("metadata refresh for '{vault_id}' failed: {e}");
					}
				}
				_ = pending_timer.tick() => {
					if let Err(e) = sync_pending(&*client, &store, &chain, &known, &vault_id).await {
						log::warn!("pending poll for '{vault_id}' failed: {e}");
						continue;
					}
					if let Some(backend) = backend.as_deref() {
						match promote_drafts(backend, &store, &vault_id, &mut known).await {
							Ok(0) => {},
							Ok(n) => log::info!("promoted {n} backend draft(s) for '{vault_id}'"),
							Err(e) => log::warn!("draft promotion for '{vault_id}' failed: {e}"),
						}
					}
				}
			}
		}
	})
}
