//! Chain access
//!
//! [`ChainClient`] is the narrow interface the orchestrator and poller need from a node.
//! [`RpcChainClient`] implements it over a `jsonrpsee` WebSocket connection using raw storage
//! keys and runtime API calls, so no generated runtime bindings are required. Dispatch
//! results are read back from `System.Events` through the runtime's own type registry.

use crate::{
	chain::{
		call::Weight,
		events::{dispatch_outcome, DispatchOutcome},
		metadata::CallIndexTable,
		storage::{
			call_hash_from_key, decode_nominations, decode_pending_multisig, decode_proxies,
			events_key, multisigs_prefix, nominators_key, proxies_key, PendingMultisig,
			ProxyDefinition,
		},
	},
	config::AccountKind,
	error::{Result, SignetError},
	log_verbose,
	vault::address::Address,
};
use codec::{Decode, Encode};
use jsonrpsee::{
	core::client::{ClientT, SubscriptionClientT},
	rpc_params,
	ws_client::{WsClient, WsClientBuilder},
};
use serde::{Deserialize, Serialize};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;
use std::{future::Future, time::Duration};
use tokio::sync::OnceCell;

/// Weight and fee of a call as reported by the transaction payment runtime API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Decode, Serialize, Deserialize)]
pub struct CallInfo {
	pub weight: Weight,
	pub class: u8,
	pub partial_fee: u128,
}

/// Where a submitted extrinsic landed and how it dispatched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedExtrinsic {
	pub block_hash: H256,
	pub block_number: u32,
	pub extrinsic_index: u32,
	pub extrinsic_hash: H256,
	pub outcome: DispatchOutcome,
}

/// Node operations used by the vault
pub trait ChainClient {
	/// Calls of a multisig account currently awaiting approvals
	fn pending_multisigs(
		&self,
		multisig: &Address,
	) -> impl Future<Output = Result<Vec<PendingMultisig>>> + Send;

	/// Proxies registered for an account
	fn proxy_delegates(
		&self,
		proxied: &Address,
	) -> impl Future<Output = Result<Vec<ProxyDefinition>>> + Send;

	/// Validators an account currently nominates; empty when it does not nominate
	fn nominations(&self, stash: &Address) -> impl Future<Output = Result<Vec<Address>>> + Send;

	/// Weight and fee estimate for an encoded call
	fn query_call_info(&self, call: &[u8]) -> impl Future<Output = Result<CallInfo>> + Send;

	/// Submit a signed extrinsic, wait until it is in a block and report its dispatch result
	fn submit_extrinsic(
		&self,
		extrinsic: &[u8],
	) -> impl Future<Output = Result<SubmittedExtrinsic>> + Send;
}

/// Wallet bridge that turns a call into a signed extrinsic.
///
/// Returns [`SignetError::SigningCancelled`] when the user dismisses the prompt.
pub trait ExtrinsicSigner {
	/// Account that signs
	fn address(&self) -> Address;

	fn sign(&self, call: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Keys fetched per `state_getKeysPaged` request
const KEYS_PAGE_SIZE: u32 = 256;

#[derive(Debug, Deserialize)]
struct RpcHeader {
	number: String,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
	header: RpcHeader,
	extrinsics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcSignedBlock {
	block: RpcBlock,
}

fn decode_rpc_hex(value: &str, what: &str) -> Result<Vec<u8>> {
	hex::decode(value.trim_start_matches("0x"))
		.map_err(|e| SignetError::NetworkError(format!("node returned invalid hex for {what}: {e}")))
}

fn rpc_error(what: &str) -> impl FnOnce(jsonrpsee::core::ClientError) -> SignetError + '_ {
	move |e| SignetError::NetworkError(format!("{what}: {e:?}"))
}

/// `ChainClient` over a WebSocket RPC connection
pub struct RpcChainClient {
	rpc: WsClient,
	node_url: String,
	account_kind: AccountKind,
	/// Metadata-built table, fetched once per connection
	table: OnceCell<CallIndexTable>,
}

impl RpcChainClient {
	pub async fn new(node_url: &str, account_kind: AccountKind) -> Result<Self> {
		log_verbose!("🔗 Connecting to node: {}", node_url);

		let rpc = WsClientBuilder::default()
			.connection_timeout(Duration::from_secs(30))
			.request_timeout(Duration::from_secs(30))
			.build(node_url)
			.await
			.map_err(|e| SignetError::NetworkError(format!("Failed to create RPC client: {e:?}")))?;

		log_verbose!("✅ Connected to {}", node_url);
		Ok(Self { rpc, node_url: node_url.to_string(), account_kind, table: OnceCell::new() })
	}

	pub fn node_url(&self) -> &str {
		&self.node_url
	}

	pub async fn latest_block_hash(&self) -> Result<H256> {
		self.rpc
			.request::<H256, [(); 0]>("chain_getBlockHash", [])
			.await
			.map_err(rpc_error("Failed to fetch latest block hash"))
	}

	/// Raw SCALE-encoded runtime metadata
	pub async fn fetch_metadata(&self) -> Result<Vec<u8>> {
		let raw: String = self
			.rpc
			.request("state_getMetadata", rpc_params![])
			.await
			.map_err(rpc_error("Failed to fetch metadata"))?;
		decode_rpc_hex(&raw, "metadata")
	}

	/// Call index table from the node's metadata
	pub async fn call_table(&self) -> Result<CallIndexTable> {
		self.runtime_table().await.cloned()
	}

	async fn runtime_table(&self) -> Result<&CallIndexTable> {
		self.table
			.get_or_try_init(|| async {
				let table = CallIndexTable::from_metadata_bytes(&self.fetch_metadata().await?)?;
				log_verbose!("📋 Loaded {} calls from runtime metadata", table.len());
				Ok::<_, SignetError>(table)
			})
			.await
	}

	/// Dispatch result of an included extrinsic, from the block's events
	async fn dispatch_result(&self, block_hash: H256, extrinsic_index: u32) -> Result<DispatchOutcome> {
		let table = self.runtime_table().await?;
		let types = table.runtime_types().ok_or_else(|| {
			SignetError::Serialization("runtime metadata carries no type registry".to_string())
		})?;
		let events = self.storage(&events_key(), Some(block_hash)).await?.ok_or_else(|| {
			SignetError::SubmissionFailure(format!("no events stored for block {block_hash:?}"))
		})?;
		dispatch_outcome(types, &events, extrinsic_index)
	}

	async fn storage(&self, key: &[u8], at: Option<H256>) -> Result<Option<Vec<u8>>> {
		let value: Option<String> = self
			.rpc
			.request("state_getStorage", rpc_params![format!("0x{}", hex::encode(key)), at])
			.await
			.map_err(rpc_error("Failed to read storage"))?;
		value.map(|v| decode_rpc_hex(&v, "storage value")).transpose()
	}

	async fn keys_with_prefix(&self, prefix: &[u8], at: H256) -> Result<Vec<Vec<u8>>> {
		let prefix_hex = format!("0x{}", hex::encode(prefix));
		let mut keys = Vec::new();
		let mut start: Option<String> = None;
		loop {
			let page: Vec<String> = self
				.rpc
				.request(
					"state_getKeysPaged",
					rpc_params![&prefix_hex, KEYS_PAGE_SIZE, start.clone(), at],
				)
				.await
				.map_err(rpc_error("Failed to list storage keys"))?;
			let full = page.len() as u32 == KEYS_PAGE_SIZE;
			start = page.last().cloned();
			for key in &page {
				keys.push(decode_rpc_hex(key, "storage key")?);
			}
			if !full {
				return Ok(keys);
			}
		}
	}

	async fn find_extrinsic(&self, block_hash: H256, extrinsic_hash: H256) -> Result<(u32, u32)> {
		let signed: RpcSignedBlock = self
			.rpc
			.request("chain_getBlock", rpc_params![block_hash])
			.await
			.map_err(rpc_error("Failed to fetch block"))?;
		let number = u32::from_str_radix(signed.block.header.number.trim_start_matches("0x"), 16)
			.map_err(|e| SignetError::NetworkError(format!("invalid block number: {e}")))?;
		for (index, ext) in signed.block.extrinsics.iter().enumerate() {
			if blake2_256(&decode_rpc_hex(ext, "extrinsic")?) == extrinsic_hash.0 {
				return Ok((number, index as u32));
			}
		}
		Err(SignetError::SubmissionFailure(format!(
			"extrinsic {extrinsic_hash:?} not found in block {block_hash:?}"
		)))
	}
}

impl ChainClient for RpcChainClient {
	async fn pending_multisigs(&self, multisig: &Address) -> Result<Vec<PendingMultisig>> {
		let at = self.latest_block_hash().await?;
		let keys = self.keys_with_prefix(&multisigs_prefix(multisig), at).await?;
		let mut pending = Vec::with_capacity(keys.len());
		for key in keys {
			let call_hash = call_hash_from_key(multisig, &key)?;
			// Entries can be removed between listing and reading
			if let Some(value) = self.storage(&key, Some(at)).await? {
				pending.push(decode_pending_multisig(call_hash, &value, self.account_kind)?);
			}
		}
		log_verbose!("📦 {} pending multisig calls for {}", pending.len(), multisig);
		Ok(pending)
	}

	async fn proxy_delegates(&self, proxied: &Address) -> Result<Vec<ProxyDefinition>> {
		match self.storage(&proxies_key(proxied), None).await? {
			Some(value) => decode_proxies(&value, self.account_kind),
			None => Ok(Vec::new()),
		}
	}

	async fn nominations(&self, stash: &Address) -> Result<Vec<Address>> {
		match self.storage(&nominators_key(stash), None).await? {
			Some(value) => decode_nominations(&value, self.account_kind),
			None => Ok(Vec::new()),
		}
	}

	async fn query_call_info(&self, call: &[u8]) -> Result<CallInfo> {
		let mut args = call.to_vec();
		(call.len() as u32).encode_to(&mut args);
		let raw: String = self
			.rpc
			.request(
				"state_call",
				rpc_params![
					"TransactionPaymentCallApi_query_call_info",
					format!("0x{}", hex::encode(&args))
				],
			)
			.await
			.map_err(rpc_error("Failed to query call info"))?;
		let bytes = decode_rpc_hex(&raw, "call info")?;
		CallInfo::decode(&mut &bytes[..])
			.map_err(|e| SignetError::Serialization(format!("failed to decode call info: {e}")))
	}

	async fn submit_extrinsic(&self, extrinsic: &[u8]) -> Result<SubmittedExtrinsic> {
		let extrinsic_hash = H256(blake2_256(extrinsic));
		let mut subscription = self
			.rpc
			.subscribe::<serde_json::Value, _>(
				"author_submitAndWatchExtrinsic",
				rpc_params![format!("0x{}", hex::encode(extrinsic))],
				"author_unwatchExtrinsic",
			)
			.await
			.map_err(|e| SignetError::SubmissionFailure(format!("{e:?}")))?;

		while let Some(status) = subscription.next().await {
			let status = status.map_err(|e| SignetError::SubmissionFailure(e.to_string()))?;
			log_verbose!("📡 Transaction status: {}", status);

			if let Some(block) = status.get("inBlock").or_else(|| status.get("finalized")) {
				let block_hash: H256 = serde_json::from_value(block.clone())?;
				let (block_number, extrinsic_index) =
					self.find_extrinsic(block_hash, extrinsic_hash).await?;
				let outcome = self.dispatch_result(block_hash, extrinsic_index).await?;
				if let DispatchOutcome::Failed(reason) = &outcome {
					log::warn!("extrinsic {extrinsic_hash:?} failed in block #{block_number}: {reason}");
				}
				return Ok(SubmittedExtrinsic {
					block_hash,
					block_number,
					extrinsic_index,
					extrinsic_hash,
					outcome,
				});
			}
			for terminal in ["invalid", "dropped", "usurped", "finalityTimeout"] {
				if status.as_str() == Some(terminal) || status.get(terminal).is_some() {
					return Err(SignetError::SubmissionFailure(format!(
						"transaction {terminal}: {status}"
					)));
				}
			}
		}
		Err(SignetError::SubmissionFailure("status subscription closed".to_string()))
	}
}
