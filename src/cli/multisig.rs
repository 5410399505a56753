//! `signet multisig` subcommands
use crate::{
	cli::common::{parse_signers, print_drift_notice, Session},
	error::Result,
	log_print, log_success,
	vault::{derive_multisig_address, Address, MultisigConfig},
};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug)]
pub enum MultisigCommands {
	/// Derive the multisig address for a signer set and threshold
	Derive {
		/// Signer addresses, comma-separated
		#[arg(long)]
		signers: String,

		/// Approvals required to execute
		#[arg(long)]
		threshold: u16,
	},

	/// Register a vault in the local store
	Add {
		/// Vault id
		#[arg(long)]
		id: String,

		/// Display name
		#[arg(long)]
		name: String,

		/// Signer addresses, comma-separated
		#[arg(long)]
		signers: String,

		#[arg(long)]
		threshold: u16,

		/// Account the multisig controls through a proxy
		#[arg(long)]
		proxied: String,
	},

	/// List registered vaults
	List,

	/// Remove a vault and its transactions from the local store
	Remove {
		#[arg(long)]
		id: String,
	},
}

pub fn handle_multisig_command(command: MultisigCommands, session: &Session) -> Result<()> {
	match command {
		MultisigCommands::Derive { signers, threshold } => {
			let signers = parse_signers(&signers)?;
			let address = derive_multisig_address(&signers, threshold)?;
			log_print!("🔐 {} {} of {}", "MULTISIG".bright_magenta().bold(), threshold, signers.len());
			log_print!("   Address: {}", session.display(&address).bright_green());
			log_print!("   Public key: {}", address.to_pub_key());
			Ok(())
		},
		MultisigCommands::Add { id, name, signers, threshold, proxied } => {
			let store = session.open_store()?;
			let config = MultisigConfig::new(
				id,
				name,
				session.chain.id.clone(),
				parse_signers(&signers)?,
				threshold,
				Address::from_ss58(&proxied)?,
			)?;
			let controller = session.display(&config.multisig_address());
			let name = config.name.clone();
			store.upsert_multisig(config)?;
			log_success!("✅ Vault '{}' added, controlled by {}", name, controller);
			Ok(())
		},
		MultisigCommands::List => {
			let store = session.open_store()?;
			let vaults = store.with_state(|s| s.multisigs.values().cloned().collect::<Vec<_>>());
			if vaults.is_empty() {
				log_print!("No vaults registered.");
				return Ok(());
			}
			for vault in vaults {
				log_print!("🏦 {} ({}) on {}", vault.name.bold(), vault.id, vault.chain);
				log_print!("   Proxied: {}", session.display(&vault.proxied()).bright_cyan());
				log_print!("   Multisig: {}", session.display(&vault.multisig_address()));
				log_print!(
					"   Threshold: {} of {}",
					vault.threshold().to_string().bright_yellow(),
					vault.signers().len()
				);
				for (i, signer) in vault.signers().iter().enumerate() {
					log_print!("     {}. {}", i + 1, session.display(signer));
				}
				print_drift_notice(&store, &vault.id);
			}
			Ok(())
		},
		MultisigCommands::Remove { id } => {
			session.open_store()?.remove_multisig(&id)?;
			log_success!("🗑️  Vault '{}' removed", id);
			Ok(())
		},
	}
}
