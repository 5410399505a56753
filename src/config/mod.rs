//! Configuration management module
//!
//! Chains, the GraphQL backend and polling intervals are read from a TOML file at
//! `$SIGNET_CONFIG` or `<config dir>/signet/config.toml`. Missing files fall back to defaults.

use crate::{
	chain::metadata::CallIndexTable,
	error::{Result, SignetError},
};
use serde::{Deserialize, Serialize};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
	time::Duration,
};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SIGNET_CONFIG";

/// Account format used by a chain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
	/// 32-byte accounts addressed through `MultiAddress`
	#[default]
	Substrate,
	/// 20-byte accounts used directly
	Ethereum,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
	pub symbol: String,
	pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
	pub id: u32,
	pub symbol: String,
	pub decimals: u8,
}

/// A contract ABI to load for a chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
	/// ink! metadata JSON or `.contract` bundle
	pub abi: PathBuf,
	/// Contract address, needed when the ABI carries no code hash
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
}

/// A chain the vault can operate on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
	pub id: String,
	pub name: String,
	pub ss58_prefix: u16,
	#[serde(default)]
	pub account_kind: AccountKind,
	pub rpc_url: String,
	pub native: TokenSpec,
	#[serde(default)]
	pub assets: Vec<AssetSpec>,
	/// `"Pallet.call" = [pallet_index, call_index]` overrides, used when metadata is unavailable
	#[serde(default)]
	pub call_indices: BTreeMap<String, [u8; 2]>,
	#[serde(default)]
	pub contracts: Vec<ContractSpec>,
}

impl ChainSpec {
	pub fn polkadot() -> Self {
		Self {
			id: "polkadot".to_string(),
			name: "Polkadot".to_string(),
			ss58_prefix: 0,
			account_kind: AccountKind::Substrate,
			rpc_url: "wss://rpc.polkadot.io".to_string(),
			native: TokenSpec { symbol: "DOT".to_string(), decimals: 10 },
			assets: Vec::new(),
			call_indices: BTreeMap::new(),
			contracts: Vec::new(),
		}
	}

	pub fn generic() -> Self {
		Self {
			id: "generic".to_string(),
			name: "Local development chain".to_string(),
			ss58_prefix: 42,
			account_kind: AccountKind::Substrate,
			rpc_url: "ws://127.0.0.1:9944".to_string(),
			native: TokenSpec { symbol: "UNIT".to_string(), decimals: 12 },
			assets: Vec::new(),
			call_indices: BTreeMap::new(),
			contracts: Vec::new(),
		}
	}

	/// Offline call table: the Polkadot preset for `polkadot`, then configured overrides
	pub fn call_table(&self) -> Result<CallIndexTable> {
		let mut table =
			if self.id == "polkadot" { CallIndexTable::polkadot() } else { CallIndexTable::new() };
		for (idx, pallet, call) in CallIndexTable::from_config(&self.call_indices)?.entries() {
			table.insert(pallet, call, idx.pallet_index, idx.call_index);
		}
		Ok(table)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
	/// GraphQL endpoint
	pub url: Option<String>,
	/// Bearer token sent with every request
	pub token: Option<String>,
	/// Backend user id recorded as the creator of drafts saved from this machine
	#[serde(default)]
	pub user: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
	#[serde(default = "default_pending_secs")]
	pub pending_secs: u64,
	#[serde(default = "default_metadata_secs")]
	pub metadata_secs: u64,
}

fn default_pending_secs() -> u64 {
	5
}

fn default_metadata_secs() -> u64 {
	15
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self { pending_secs: default_pending_secs(), metadata_secs: default_metadata_secs() }
	}
}

impl PollingConfig {
	pub fn pending_interval(&self) -> Duration {
		Duration::from_secs(self.pending_secs.max(1))
	}

	pub fn metadata_interval(&self) -> Duration {
		Duration::from_secs(self.metadata_secs.max(1))
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignetConfig {
	#[serde(default = "default_chains")]
	pub chains: Vec<ChainSpec>,
	#[serde(default)]
	pub backend: BackendConfig,
	#[serde(default)]
	pub polling: PollingConfig,
}

fn default_chains() -> Vec<ChainSpec> {
	vec![ChainSpec::polkadot(), ChainSpec::generic()]
}

impl Default for SignetConfig {
	fn default() -> Self {
		Self {
			chains: default_chains(),
			backend: BackendConfig::default(),
			polling: PollingConfig::default(),
		}
	}
}

impl SignetConfig {
	/// Default config file location
	pub fn default_path() -> Option<PathBuf> {
		if let Ok(path) = std::env::var(CONFIG_ENV) {
			return Some(PathBuf::from(path));
		}
		dirs::config_dir().map(|dir| dir.join("signet").join("config.toml"))
	}

	/// Load from the default location, or defaults if there is no file
	pub fn load() -> Result<Self> {
		match Self::default_path() {
			Some(path) if path.exists() => Self::load_from(&path),
			_ => Ok(Self::default()),
		}
	}

	pub fn load_from(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)?;
		let config: SignetConfig = toml::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn save_to(&self, path: &Path) -> Result<()> {
		let content = toml::to_string_pretty(self)
			.map_err(|e| SignetError::Serialization(format!("Failed to encode config: {e}")))?;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, content)?;
		Ok(())
	}

	pub fn chain(&self, id: &str) -> Result<&ChainSpec> {
		self.chains
			.iter()
			.find(|c| c.id == id)
			.ok_or_else(|| SignetError::InvalidConfig(format!("unknown chain '{id}'")))
	}

	fn validate(&self) -> Result<()> {
		let mut ids: Vec<&str> = self.chains.iter().map(|c| c.id.as_str()).collect();
		ids.sort_unstable();
		if ids.windows(2).any(|w| w[0] == w[1]) {
			return Err(SignetError::InvalidConfig("duplicate chain id".to_string()));
		}
		for chain in &self.chains {
			CallIndexTable::from_config(&chain.call_indices)?;
		}
		Ok(())
	}
}
