//! `signet approve` and `signet cancel` - sign multisig calls with an external wallet
//!
//! The vault never holds keys. The multisig call is printed, the signer signs it with their
//! wallet and pastes the signed extrinsic back; an empty answer cancels.
use crate::{
	chain::{
		calldata::parse_hex,
		client::{ExtrinsicSigner, RpcChainClient},
	},
	cli::common::{parse_hash, print_drift_notice, Session},
	error::{Result, SignetError},
	log_print, log_success, log_verbose,
	orchestrator::MultisigOrchestrator,
	sync::{refresh_known_calls, sync_pending, ChainContext, KnownCalls},
	vault::{Address, VaultStore},
};
use colored::Colorize;
use tokio::{
	io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin},
	sync::Mutex,
};

/// Wallet bridge over a line-based prompt
pub struct WalletPrompt<R> {
	address: Address,
	ss58_prefix: u16,
	input: Mutex<R>,
}

impl WalletPrompt<BufReader<Stdin>> {
	pub fn stdin(address: Address, ss58_prefix: u16) -> Self {
		Self::new(address, ss58_prefix, BufReader::new(tokio::io::stdin()))
	}
}

impl<R> WalletPrompt<R> {
	pub fn new(address: Address, ss58_prefix: u16, input: R) -> Self {
		Self { address, ss58_prefix, input: Mutex::new(input) }
	}
}

impl<R: AsyncBufRead + Unpin + Send> ExtrinsicSigner for WalletPrompt<R> {
	fn address(&self) -> Address {
		self.address
	}

	async fn sign(&self, call: &[u8]) -> Result<Vec<u8>> {
		log_print!(
			"✍️  Sign this call as {} with your wallet:",
			self.address.to_ss58(Some(self.ss58_prefix)).bright_cyan()
		);
		log_print!("   0x{}", hex::encode(call));
		log_print!("   Paste the signed extrinsic, or an empty line to cancel:");

		let mut line = String::new();
		self.input.lock().await.read_line(&mut line).await?;
		let line = line.trim();
		if line.is_empty() {
			return Err(SignetError::SigningCancelled);
		}
		let extrinsic = parse_hex(line)?;
		// A signed extrinsic ends with the call it dispatches
		if !extrinsic.ends_with(call) {
			return Err(SignetError::Generic(
				"the signed extrinsic does not carry the call shown above".to_string(),
			));
		}
		Ok(extrinsic)
	}
}

/// Refresh the vault's pending state so approvals and timepoints match the chain
async fn refresh(
	client: &RpcChainClient,
	store: &VaultStore,
	chain: &ChainContext,
	vault_id: &str,
	session: &Session,
) -> Result<()> {
	let backend = session.backend()?;
	let mut known = KnownCalls::new();
	refresh_known_calls(backend.as_ref(), store, vault_id, &mut known).await?;
	let summary = sync_pending(client, store, chain, &known, vault_id).await?;
	log_verbose!("🔄 {} added, {} updated, {} closed", summary.added, summary.updated, summary.closed);
	Ok(())
}

pub async fn handle_approve_command(
	vault_id: String,
	hash: String,
	signer: String,
	session: &Session,
) -> Result<()> {
	let store = session.open_store()?;
	let hash = parse_hash(&hash)?;
	let signer = WalletPrompt::stdin(Address::from_ss58(&signer)?, session.chain.ss58_prefix);

	let client = session.connect().await?;
	let table = session.call_table(Some(&client)).await?;
	let chain = ChainContext::new(&session.chain, table.clone())?;
	refresh(&client, &store, &chain, &vault_id, session).await?;

	let orchestrator =
		MultisigOrchestrator::new(&client, &store, &table, session.chain.account_kind);
	let outcome = match orchestrator.approve(&vault_id, &hash, &signer).await {
		Ok(outcome) => outcome,
		Err(e) if e.is_user_cancellation() => {
			log_print!("Signing cancelled; nothing was submitted");
			return Ok(());
		},
		Err(e) => {
			print_drift_notice(&store, &vault_id);
			return Err(e);
		},
	};

	log_success!(
		"✅ {} included in block #{} (extrinsic {})",
		outcome.action.to_string().bright_yellow(),
		outcome.block.block_number,
		outcome.block.extrinsic_index
	);
	if outcome.executed {
		log_success!("🚀 Transaction {:?} executed", hash);
	}
	Ok(())
}

pub async fn handle_cancel_command(
	vault_id: String,
	hash: String,
	signer: String,
	session: &Session,
) -> Result<()> {
	let store = session.open_store()?;
	let hash = parse_hash(&hash)?;
	let signer = WalletPrompt::stdin(Address::from_ss58(&signer)?, session.chain.ss58_prefix);

	let client = session.connect().await?;
	let table = session.call_table(Some(&client)).await?;
	let chain = ChainContext::new(&session.chain, table.clone())?;
	refresh(&client, &store, &chain, &vault_id, session).await?;

	let orchestrator =
		MultisigOrchestrator::new(&client, &store, &table, session.chain.account_kind);
	match orchestrator.cancel(&vault_id, &hash, &signer).await {
		Ok(block) => {
			log_success!("🗑️  Transaction {:?} cancelled in block #{}", hash, block.block_number);
			Ok(())
		},
		Err(e) if e.is_user_cancellation() => {
			log_print!("Signing cancelled; nothing was submitted");
			Ok(())
		},
		Err(e) => Err(e),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn prompt(answer: &'static str) -> WalletPrompt<&'static [u8]> {
		WalletPrompt::new(Address::Substrate([1u8; 32]), 0, answer.as_bytes())
	}

	#[tokio::test]
	async fn test_pasted_extrinsic_is_returned() {
		let call = [0x1e, 0x02, 0xaa];
		let signed = prompt("0x84ff0102031e02aa\n").sign(&call).await.unwrap();
		assert_eq!(signed, vec![0x84, 0xff, 0x01, 0x02, 0x03, 0x1e, 0x02, 0xaa]);
	}

	#[tokio::test]
	async fn test_empty_answer_cancels() {
		let err = prompt("\n").sign(&[1, 2]).await.unwrap_err();
		assert!(err.is_user_cancellation());
		assert!(prompt("").sign(&[1, 2]).await.unwrap_err().is_user_cancellation());
	}

	#[tokio::test]
	async fn test_extrinsic_for_another_call_is_rejected() {
		let err = prompt("0x84ff010203\n").sign(&[0x1e, 0x02]).await.unwrap_err();
		assert!(!err.is_user_cancellation());
		assert!(prompt("zz\n").sign(&[0x1e]).await.is_err());
	}
}
