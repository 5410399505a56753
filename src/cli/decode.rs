//! `signet decode` - decode and classify call data for a vault
use crate::{
	chain::calldata::{decode_call_data, ensure_proxy_wrapped, parse_hex},
	cli::common::Session,
	decoders::{DecodedTransaction, TxMetadata},
	error::{Result, SignetError},
	log_print, log_success, log_verbose,
	sync::{current_nominations, save_draft, ChainContext},
	vault::Address,
};
use colored::Colorize;
use std::path::PathBuf;

pub struct DecodeOptions {
	pub vault_id: String,
	pub call_data: String,
	pub description: Option<String>,
	pub wrap: bool,
	pub save: bool,
	pub offline: bool,
	pub json: bool,
	/// Extra contract ABIs, `PATH` or `ADDRESS=PATH`
	pub abis: Vec<String>,
}

/// Split an `--abi` value into an optional contract address and a file path
pub fn parse_abi_arg(arg: &str) -> Result<(Option<Address>, PathBuf)> {
	match arg.split_once('=') {
		Some((address, path)) if !path.is_empty() =>
			Ok((Some(Address::from_ss58(address.trim())?), PathBuf::from(path))),
		Some(_) => Err(SignetError::InvalidConfig(format!("missing ABI path in '{arg}'"))),
		None => Ok((None, PathBuf::from(arg))),
	}
}

pub async fn handle_decode_command(options: DecodeOptions, session: &Session) -> Result<()> {
	let store = session.open_store()?;
	let vault = store.multisig(&options.vault_id)?;

	let client = if options.offline { None } else { Some(session.connect().await?) };
	let table = session.call_table(client.as_ref()).await?;
	let mut chain = ChainContext::new(&session.chain, table)?;
	for arg in &options.abis {
		let (address, path) = parse_abi_arg(arg)?;
		chain.abis.load_file(&path, address)?;
	}
	log_verbose!("📜 {} contract ABI(s) registered", chain.abis.len());

	let mut call_data = parse_hex(&options.call_data)?;
	if options.wrap {
		let codec = chain.codec();
		let call = decode_call_data(&codec, &options.call_data)?;
		let wrapped = ensure_proxy_wrapped(&codec, call, vault.proxied())?;
		call_data = codec.encode(&wrapped)?;
		log_verbose!("🎁 Proxy-wrapped call data: 0x{}", hex::encode(&call_data));
	}

	let nominations = match &client {
		Some(client) => current_nominations(client, &chain, &vault, &call_data).await?,
		None => None,
	};
	let metadata = options
		.description
		.map(|description| TxMetadata { description: Some(description), ..Default::default() });

	let decoded = chain.decode(&vault, call_data, metadata.as_ref(), nominations.as_deref())?;

	if options.json {
		log_print!("{}", serde_json::to_string_pretty(&decoded)?);
	} else {
		print_decoded(&decoded);
	}

	if options.save {
		let backend = session.backend()?;
		let creator = session.config.backend.user.clone();
		save_draft(backend.as_ref(), &store, &vault, &decoded, metadata.as_ref(), creator).await?;
		let place = if backend.is_some() { "locally and on the backend" } else { "locally" };
		log_success!("💾 Saved as draft {:?} ({place})", decoded.hash);
	}
	Ok(())
}

fn print_decoded(decoded: &DecodedTransaction) {
	log_print!("🧾 {}", "TRANSACTION".bright_magenta().bold());
	log_print!("   Type: {}", decoded.kind.name().bright_yellow());
	log_print!("   Description: {}", decoded.description.bright_green());
	log_print!("   Call: {}", decoded.inner.name());
	log_print!("   Hash: {:?}", decoded.hash);
	log_verbose!("   Call data: 0x{}", hex::encode(&decoded.call_data));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_abi_arg() {
		let (address, path) = parse_abi_arg("flipper.contract").unwrap();
		assert!(address.is_none());
		assert_eq!(path, PathBuf::from("flipper.contract"));

		let contract = Address::Substrate([4u8; 32]);
		let (address, path) =
			parse_abi_arg(&format!("{}=/tmp/flipper.json", contract.to_pub_key())).unwrap();
		assert_eq!(address, Some(contract));
		assert_eq!(path, PathBuf::from("/tmp/flipper.json"));

		assert!(parse_abi_arg("nonsense=/tmp/a.json").is_err());
		assert!(parse_abi_arg(&format!("{}=", contract.to_pub_key())).is_err());
	}
}
