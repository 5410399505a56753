//! `signet metadata` - dump the call index table
use crate::{cli::common::Session, error::Result, log_print};
use colored::Colorize;

pub async fn handle_metadata_command(
	offline: bool,
	pallet: Option<String>,
	session: &Session,
) -> Result<()> {
	let client = if offline { None } else { Some(session.connect().await?) };
	let table = session.call_table(client.as_ref()).await?;

	log_print!("{}", "🏛️  Call indices".bold().underline());
	let mut current = "";
	for (idx, pallet_name, call) in table.entries() {
		if pallet.as_deref().is_some_and(|p| !p.eq_ignore_ascii_case(pallet_name)) {
			continue;
		}
		if pallet_name != current {
			log_print!("- Pallet: {} [{}]", pallet_name.bold().bright_blue(), idx.pallet_index);
			current = pallet_name;
		}
		log_print!("\t- {} [{}, {}]", call, idx.pallet_index, idx.call_index);
	}
	Ok(())
}
