//! `signet address` subcommands
use crate::{error::Result, log_print, vault::Address};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug)]
pub enum AddressCommands {
	/// Show every encoding of an address
	Inspect {
		/// SS58 address or 0x hex public key
		address: String,

		/// SS58 prefix to encode with (defaults to the selected chain)
		#[arg(long)]
		prefix: Option<u16>,
	},
}

pub fn handle_address_command(command: AddressCommands, chain_prefix: u16) -> Result<()> {
	match command {
		AddressCommands::Inspect { address, prefix } =>
			inspect(&address, prefix.unwrap_or(chain_prefix)),
	}
}

fn inspect(input: &str, prefix: u16) -> Result<()> {
	let address = Address::from_ss58(input)?;

	log_print!("🔎 {}", "ADDRESS".bright_magenta().bold());
	log_print!(
		"   Kind: {}",
		if address.is_ethereum() { "Ethereum (20 bytes)" } else { "Substrate (32 bytes)" }
	);
	log_print!("   Public key: {}", address.to_pub_key().bright_cyan());
	log_print!("   Encoded (prefix {}): {}", prefix, address.to_ss58(Some(prefix)).bright_green());
	log_print!("   Short: {}", address.to_short_ss58(Some(prefix), 6));
	Ok(())
}
