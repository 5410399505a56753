//! GraphQL client for off-chain transaction metadata and drafts.

use crate::error::{Result, SignetError};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::types::{GraphQLResponse, PageParams, TxDraftRow, TxMetadataRow};

const TX_METADATA_QUERY: &str = r#"
	query TxMetadata($teamId: String!, $limit: Int!, $offset: Int!, $createdAfter: timestamptz) {
		tx_metadata(
			where: { teamId: { _eq: $teamId }, createdAt: { _gt: $createdAfter } }
			order_by: { createdAt: asc }
			limit: $limit
			offset: $offset
		) {
			teamId
			callHash
			callData
			description
			changeConfigDetails
			contractDeployed
			createdBy
			createdAt
		}
	}
"#;

const INSERT_TX_METADATA: &str = r#"
	mutation InsertTxMetadata($row: tx_metadata_insert_input!) {
		insert_tx_metadata_one(
			object: $row
			on_conflict: { constraint: tx_metadata_pkey, update_columns: [description, changeConfigDetails, contractDeployed] }
		) {
			callHash
		}
	}
"#;

const TX_DRAFTS_QUERY: &str = r#"
	query TxDrafts($teamId: String!, $limit: Int!, $offset: Int!) {
		tx_draft(
			where: { teamId: { _eq: $teamId } }
			order_by: { createdAt: asc }
			limit: $limit
			offset: $offset
		) {
			id
			teamId
			callData
			description
			changeConfigDetails
			creatorId
			createdAt
		}
	}
"#;

const INSERT_TX_DRAFT: &str = r#"
	mutation InsertTxDraft($row: tx_draft_insert_input!) {
		insert_tx_draft_one(object: $row) {
			id
			teamId
			callData
			description
			changeConfigDetails
			creatorId
			createdAt
		}
	}
"#;

const DELETE_TX_DRAFT: &str = r#"
	mutation DeleteTxDraft($id: uuid!) {
		delete_tx_draft_by_pk(id: $id) {
			id
		}
	}
"#;

/// Client for the vault metadata backend.
pub struct BackendClient {
	url: String,
	token: Option<String>,
	http_client: Client,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
	query: &'a str,
	variables: serde_json::Value,
}

#[derive(Deserialize)]
struct TxMetadataData {
	tx_metadata: Vec<TxMetadataRow>,
}

#[derive(Deserialize)]
struct TxDraftsData {
	tx_draft: Vec<TxDraftRow>,
}

#[derive(Deserialize)]
struct InsertDraftData {
	insert_tx_draft_one: TxDraftRow,
}

#[derive(Deserialize)]
struct DeletedRow {
	#[allow(dead_code)]
	id: String,
}

#[derive(Deserialize)]
struct DeleteDraftData {
	delete_tx_draft_by_pk: Option<DeletedRow>,
}

impl BackendClient {
	/// Create a new backend client.
	///
	/// # Arguments
	///
	/// * `url` - GraphQL endpoint (e.g. "https://api.signet.example/v1/graphql")
	/// * `token` - Optional bearer token sent with every request
	pub fn new(url: String, token: Option<String>) -> Result<Self> {
		let http_client = Client::builder()
			.build()
			.map_err(|e| SignetError::Backend(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self { url, token, http_client })
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Run one GraphQL operation and unwrap its `data`.
	pub async fn execute<T: DeserializeOwned>(
		&self,
		query: &str,
		variables: serde_json::Value,
	) -> Result<T> {
		let request = GraphQLRequest { query, variables };

		let mut builder = self.http_client.post(&self.url).json(&request);
		if let Some(token) = &self.token {
			builder = builder.bearer_auth(token);
		}

		let response = builder
			.send()
			.await
			.map_err(|e| SignetError::NetworkError(format!("Failed to send request: {}", e)))?;

		if !response.status().is_success() {
			let status = response.status();
			let body = response.text().await.unwrap_or_default();
			return Err(SignetError::Backend(format!(
				"Backend request failed with status {}: {}",
				status, body
			)));
		}

		let graphql_response: GraphQLResponse<T> = response
			.json()
			.await
			.map_err(|e| SignetError::Backend(format!("Failed to parse response: {}", e)))?;

		graphql_response.into_result()
	}

	/// Saved metadata for every transaction of a vault.
	pub async fn fetch_tx_metadata(
		&self,
		team_id: &str,
		params: PageParams,
	) -> Result<Vec<TxMetadataRow>> {
		let data: TxMetadataData = self
			.execute(TX_METADATA_QUERY, page_variables(team_id, &params))
			.await?;
		Ok(data.tx_metadata)
	}

	/// Save or update metadata for a transaction.
	pub async fn insert_tx_metadata(&self, row: &TxMetadataRow) -> Result<()> {
		let _: serde_json::Value =
			self.execute(INSERT_TX_METADATA, serde_json::json!({ "row": row })).await?;
		Ok(())
	}

	pub async fn list_drafts(&self, team_id: &str, params: PageParams) -> Result<Vec<TxDraftRow>> {
		let data: TxDraftsData =
			self.execute(TX_DRAFTS_QUERY, page_variables(team_id, &params)).await?;
		Ok(data.tx_draft)
	}

	/// Insert a draft and return it with its backend id.
	pub async fn insert_draft(&self, draft: &TxDraftRow) -> Result<TxDraftRow> {
		let data: InsertDraftData =
			self.execute(INSERT_TX_DRAFT, serde_json::json!({ "row": draft })).await?;
		Ok(data.insert_tx_draft_one)
	}

	/// Delete a draft. Returns false when no draft had that id.
	pub async fn delete_draft(&self, id: &str) -> Result<bool> {
		let data: DeleteDraftData =
			self.execute(DELETE_TX_DRAFT, serde_json::json!({ "id": id })).await?;
		Ok(data.delete_tx_draft_by_pk.is_some())
	}
}

fn page_variables(team_id: &str, params: &PageParams) -> serde_json::Value {
	let mut variables = serde_json::json!({
		"teamId": team_id,
		"limit": params.limit,
		"offset": params.offset,
	});

	if let Some(time) = &params.created_after {
		variables["createdAfter"] = serde_json::json!(time);
	}

	variables
}
