//! Shared helpers for CLI commands
use crate::{
	backend::BackendClient,
	chain::{client::RpcChainClient, metadata::CallIndexTable},
	config::{ChainSpec, SignetConfig},
	error::{Result, SignetError},
	log_verbose,
	vault::{Address, VaultStore},
};
use colored::Colorize;
use sp_core::H256;
use std::path::PathBuf;

/// Environment variable overriding the vault store location
pub const STORE_ENV: &str = "SIGNET_STORE";

/// Global options resolved against the configuration
pub struct Session {
	pub config: SignetConfig,
	pub chain: ChainSpec,
	pub node_url: String,
}

impl Session {
	pub fn load(chain_id: &str, node_url: Option<String>) -> Result<Self> {
		let config = SignetConfig::load()?;
		let chain = config.chain(chain_id)?.clone();
		let node_url = node_url.unwrap_or_else(|| chain.rpc_url.clone());
		Ok(Self { config, chain, node_url })
	}

	pub fn open_store(&self) -> Result<VaultStore> {
		let path = store_path()?;
		log_verbose!("📂 Vault store: {}", path.display());
		VaultStore::open(path)
	}

	pub async fn connect(&self) -> Result<RpcChainClient> {
		RpcChainClient::new(&self.node_url, self.chain.account_kind).await
	}

	/// Call table from the node's metadata, or the configured table when offline
	pub async fn call_table(&self, client: Option<&RpcChainClient>) -> Result<CallIndexTable> {
		match client {
			Some(client) => {
				let table = client.call_table().await?;
				log_verbose!("📚 Loaded {} calls from runtime metadata", table.len());
				Ok(table)
			},
			None => {
				let table = self.chain.call_table()?;
				if table.is_empty() {
					return Err(SignetError::InvalidConfig(format!(
						"no offline call table for chain '{}'; add call_indices or drop --offline",
						self.chain.id
					)));
				}
				log_verbose!("📚 Using offline call table ({} calls)", table.len());
				Ok(table)
			},
		}
	}

	pub fn backend(&self) -> Result<Option<BackendClient>> {
		match &self.config.backend.url {
			Some(url) => Ok(Some(BackendClient::new(url.clone(), self.config.backend.token.clone())?)),
			None => Ok(None),
		}
	}

	pub fn display(&self, address: &Address) -> String {
		address.to_ss58(Some(self.chain.ss58_prefix))
	}
}

/// `$SIGNET_STORE`, or `<data dir>/signet/vault.json`
pub fn store_path() -> Result<PathBuf> {
	if let Ok(path) = std::env::var(STORE_ENV) {
		return Ok(PathBuf::from(path));
	}
	dirs::data_dir()
		.map(|dir| dir.join("signet").join("vault.json"))
		.ok_or_else(|| SignetError::InvalidConfig("could not determine data directory".to_string()))
}

/// Comma-separated list of SS58 or hex addresses
pub fn parse_signers(list: &str) -> Result<Vec<Address>> {
	list.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(Address::from_ss58)
		.collect()
}

pub fn parse_hash(input: &str) -> Result<H256> {
	let body = input.trim().trim_start_matches("0x");
	let bytes = hex::decode(body)
		.map_err(|e| SignetError::Generic(format!("invalid hash '{input}': {e}")))?;
	if bytes.len() != 32 {
		return Err(SignetError::Generic(format!(
			"invalid hash '{input}': expected 32 bytes, got {}",
			bytes.len()
		)));
	}
	Ok(H256::from_slice(&bytes))
}

/// Show a persistent drift notice for the vault, if any
pub fn print_drift_notice(store: &VaultStore, vault_id: &str) {
	if let Some(notice) = store.drift_notice(vault_id) {
		crate::log_warn!("{} {}", "⚠️  Configuration drift:".bright_yellow().bold(), notice);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_signers() {
		let a = Address::Substrate([1; 32]).to_pub_key();
		let b = Address::Substrate([2; 32]).to_ss58(Some(0));
		let signers = parse_signers(&format!("{a}, {b},")).unwrap();
		assert_eq!(signers, vec![Address::Substrate([1; 32]), Address::Substrate([2; 32])]);
		assert!(parse_signers("nonsense").is_err());
	}

	#[test]
	fn test_parse_hash() {
		let hash = H256::repeat_byte(0xab);
		assert_eq!(parse_hash(&format!("{hash:?}")).unwrap(), hash);
		assert!(parse_hash("0x1234").is_err());
	}
}
