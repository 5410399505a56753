use crate::{error::Result, log_print};
use clap::Subcommand;

pub mod address;
pub mod approve;
pub mod common;
pub mod decode;
pub mod metadata;
pub mod multisig;
pub mod pending;
pub mod plan;

use common::Session;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Address utilities
	#[command(subcommand)]
	Address(address::AddressCommands),

	/// Multisig derivation and vault registry
	#[command(subcommand)]
	Multisig(multisig::MultisigCommands),

	/// Decode and classify call data for a vault
	Decode {
		/// Vault id
		#[arg(long)]
		vault: String,

		/// 0x-prefixed call data
		call_data: String,

		/// Description to attach instead of the generated one
		#[arg(long)]
		description: Option<String>,

		/// Wrap the call in a proxy call for the vault's proxied account if needed
		#[arg(long)]
		wrap: bool,

		/// Save the transaction as a local draft
		#[arg(long)]
		save: bool,

		/// Use the configured call table instead of the node's metadata
		#[arg(long)]
		offline: bool,

		/// Print the decoded transaction as JSON
		#[arg(long)]
		json: bool,

		/// Contract ABI file, optionally bound to a contract address
		#[arg(long = "abi", value_name = "[ADDRESS=]PATH")]
		abi: Vec<String>,
	},

	/// Refresh and list open transactions of a vault
	Pending {
		/// Vault id
		#[arg(long)]
		vault: String,

		/// Keep polling and print the list whenever it changes
		#[arg(long)]
		watch: bool,
	},

	/// Show the next multisig call a signer would submit, with its fee
	Plan {
		/// Vault id
		#[arg(long)]
		vault: String,

		/// Transaction hash
		#[arg(long)]
		hash: String,

		/// Signer address
		#[arg(long)]
		signer: String,
	},

	/// Approve (or execute) a transaction, signing with an external wallet
	Approve {
		/// Vault id
		#[arg(long)]
		vault: String,

		/// Transaction hash
		#[arg(long)]
		hash: String,

		/// Signer address
		#[arg(long)]
		signer: String,
	},

	/// Cancel a pending transaction; only its depositor can
	Cancel {
		/// Vault id
		#[arg(long)]
		vault: String,

		/// Transaction hash
		#[arg(long)]
		hash: String,

		/// Signer address
		#[arg(long)]
		signer: String,
	},

	/// Dump the call index table
	Metadata {
		/// Use the configured call table instead of the node's metadata
		#[arg(long)]
		offline: bool,

		/// Only show this pallet
		#[arg(long)]
		pallet: Option<String>,
	},

	/// Show version information
	Version,
}

/// Execute a CLI command
pub async fn execute_command(
	command: Commands,
	chain_id: &str,
	node_url: Option<String>,
) -> Result<()> {
	if let Commands::Version = command {
		log_print!("{} {}", crate::name(), crate::version());
		return Ok(());
	}

	let session = Session::load(chain_id, node_url)?;
	match command {
		Commands::Address(cmd) => address::handle_address_command(cmd, session.chain.ss58_prefix),
		Commands::Multisig(cmd) => multisig::handle_multisig_command(cmd, &session),
		Commands::Decode { vault, call_data, description, wrap, save, offline, json, abi } =>
			decode::handle_decode_command(
				decode::DecodeOptions {
					vault_id: vault,
					call_data,
					description,
					wrap,
					save,
					offline,
					json,
					abis: abi,
				},
				&session,
			)
			.await,
		Commands::Pending { vault, watch } =>
			pending::handle_pending_command(vault, watch, &session).await,
		Commands::Plan { vault, hash, signer } =>
			plan::handle_plan_command(vault, hash, signer, &session).await,
		Commands::Approve { vault, hash, signer } =>
			approve::handle_approve_command(vault, hash, signer, &session).await,
		Commands::Cancel { vault, hash, signer } =>
			approve::handle_cancel_command(vault, hash, signer, &session).await,
		Commands::Metadata { offline, pallet } =>
			metadata::handle_metadata_command(offline, pallet, &session).await,
		Commands::Version => Ok(()),
	}
}
