//! `signet plan` - show the next multisig call a signer would submit
use crate::{
	chain::tokens::TokenRegistry,
	cli::common::{parse_hash, print_drift_notice, Session},
	error::{Result, SignetError},
	log_print,
	orchestrator::MultisigOrchestrator,
	vault::Address,
};
use colored::Colorize;

pub async fn handle_plan_command(
	vault_id: String,
	hash: String,
	signer: String,
	session: &Session,
) -> Result<()> {
	let store = session.open_store()?;
	let vault = store.multisig(&vault_id)?;
	let hash = parse_hash(&hash)?;
	let signer = Address::from_ss58(&signer)?;
	let record = store
		.with_state(|s| s.transaction(&vault_id, &hash).cloned())
		.ok_or_else(|| SignetError::Generic(format!("unknown transaction {hash:?}")))?;

	let client = session.connect().await?;
	let table = session.call_table(Some(&client)).await?;
	let orchestrator =
		MultisigOrchestrator::new(&client, &store, &table, session.chain.account_kind);

	if let Err(e) = orchestrator.verify_proxy_relationship(&vault).await {
		print_drift_notice(&store, &vault_id);
		return Err(e);
	}

	let plan = orchestrator.plan(&vault, &record, &signer).await?;
	let fee = orchestrator.estimate_fee(&plan).await?;
	let tokens = TokenRegistry::from_chain(&session.chain);

	log_print!("🧭 {}", "NEXT APPROVAL".bright_magenta().bold());
	log_print!("   Transaction: {}", record.description);
	log_print!(
		"   Approvals: {}/{}",
		record.approvals.approved_count(),
		vault.threshold()
	);
	log_print!("   Call: {}", plan.action.to_string().bright_yellow());
	log_print!("   Executes: {}", if plan.action.executes() { "yes" } else { "no" });
	log_print!("   Estimated fee: {}", tokens.native().format(fee.partial_fee).bright_green());
	log_print!("   Weight: ref_time {}, proof_size {}", fee.weight.ref_time, fee.weight.proof_size);
	log_print!("   Call data: 0x{}", hex::encode(&plan.call_data));
	Ok(())
}
