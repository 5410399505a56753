//! Types for the off-chain metadata backend.

use crate::{
	decoders::{ProposedConfig, TxMetadata},
	error::{Result, SignetError},
	vault::address::Address,
};
use serde::{Deserialize, Serialize};
use sp_crypto_hashing::blake2_256;

/// Saved metadata for a transaction, keyed by vault and call hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMetadataRow {
	/// Vault (team) id
	pub team_id: String,

	/// Canonical call hash, `0x` hex
	pub call_hash: String,

	/// Proxy-wrapped call data, `0x` hex
	pub call_data: String,

	/// Human description entered by the creator
	pub description: Option<String>,

	/// Proposed signers and threshold for configuration changes
	pub change_config_details: Option<ProposedConfig>,

	/// Contract created by a deployment
	pub contract_deployed: Option<Address>,

	/// Backend user id of the creator
	pub created_by: Option<String>,

	/// RFC 3339 creation time
	pub created_at: Option<String>,
}

impl TxMetadataRow {
	/// Row for proxy-wrapped call data; the call hash is derived from it
	pub fn new(
		team_id: &str,
		call_data: &[u8],
		hints: Option<&TxMetadata>,
		created_by: Option<String>,
	) -> Self {
		Self {
			team_id: team_id.to_string(),
			call_hash: format!("0x{}", hex::encode(blake2_256(call_data))),
			call_data: format!("0x{}", hex::encode(call_data)),
			description: hints.and_then(|h| h.description.clone()),
			change_config_details: hints.and_then(|h| h.change_config.clone()),
			contract_deployed: hints.and_then(|h| h.contract_deployed),
			created_by,
			created_at: None,
		}
	}

	/// Hints for the classifier
	pub fn hints(&self) -> TxMetadata {
		TxMetadata {
			description: self.description.clone(),
			change_config: self.change_config_details.clone(),
			contract_deployed: self.contract_deployed,
		}
	}
}

/// An off-chain draft transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxDraftRow {
	/// Backend id, absent until inserted
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	pub team_id: String,

	/// Proxy-wrapped call data, `0x` hex
	pub call_data: String,

	pub description: Option<String>,

	pub change_config_details: Option<ProposedConfig>,

	pub creator_id: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
}

impl TxDraftRow {
	/// A draft not yet inserted
	pub fn new(
		team_id: &str,
		call_data: &[u8],
		hints: Option<&TxMetadata>,
		creator_id: Option<String>,
	) -> Self {
		Self {
			id: None,
			team_id: team_id.to_string(),
			call_data: format!("0x{}", hex::encode(call_data)),
			description: hints.and_then(|h| h.description.clone()),
			change_config_details: hints.and_then(|h| h.change_config.clone()),
			creator_id,
			created_at: None,
		}
	}

	pub fn hints(&self) -> TxMetadata {
		TxMetadata {
			description: self.description.clone(),
			change_config: self.change_config_details.clone(),
			contract_deployed: None,
		}
	}
}

/// GraphQL response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLResponse<T> {
	pub data: Option<T>,
	pub errors: Option<Vec<GraphQLError>>,
}

impl<T> GraphQLResponse<T> {
	/// The data, or the joined error messages
	pub fn into_result(self) -> Result<T> {
		if let Some(errors) = self.errors {
			let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
			return Err(SignetError::Backend(format!("GraphQL errors: {}", messages.join("; "))));
		}
		self.data.ok_or_else(|| SignetError::Backend("No data in response".to_string()))
	}
}

/// GraphQL error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLError {
	pub message: String,
	pub path: Option<Vec<serde_json::Value>>,
}

/// Pagination for list queries.
#[derive(Debug, Clone, Default)]
pub struct PageParams {
	/// Maximum number of rows
	pub limit: u32,

	/// Offset for pagination
	pub offset: u32,

	/// Only rows created after this RFC 3339 time
	pub created_after: Option<String>,
}

impl PageParams {
	pub fn new() -> Self {
		Self { limit: 100, offset: 0, ..Default::default() }
	}

	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = limit;
		self
	}

	pub fn with_offset(mut self, offset: u32) -> Self {
		self.offset = offset;
		self
	}

	pub fn with_created_after(mut self, time: impl Into<String>) -> Self {
		self.created_after = Some(time.into());
		self
	}
}
