//! `signet pending` - refresh and list open transactions of a vault
use crate::{
	cli::common::{print_drift_notice, Session},
	error::Result,
	log_info, log_print, log_verbose,
	sync::{
		promote_drafts, refresh_known_calls, spawn_pending_poller, sync_pending, ChainContext,
		KnownCalls,
	},
	vault::{MultisigConfig, TransactionRecord, TxStatus, VaultStore},
};
use colored::Colorize;
use std::sync::Arc;

pub async fn handle_pending_command(vault_id: String, watch: bool, session: &Session) -> Result<()> {
	let store = Arc::new(session.open_store()?);
	let vault = store.multisig(&vault_id)?;

	let client = Arc::new(session.connect().await?);
	let table = session.call_table(Some(&*client)).await?;
	let chain = Arc::new(ChainContext::new(&session.chain, table)?);
	let backend = session.backend()?.map(Arc::new);

	let mut known = KnownCalls::new();
	refresh_known_calls(backend.as_deref(), &store, &vault_id, &mut known).await?;
	log_verbose!("🗂️  {} known call(s)", known.len());

	let summary = sync_pending(&*client, &store, &chain, &known, &vault_id).await?;
	log_verbose!(
		"🔄 {} added, {} updated, {} closed",
		summary.added,
		summary.updated,
		summary.closed
	);
	if let Some(backend) = backend.as_deref() {
		let promoted = promote_drafts(backend, &store, &vault_id, &mut known).await?;
		if promoted > 0 {
			log_verbose!("📤 {promoted} backend draft(s) reached the chain");
		}
	}

	print_drift_notice(&store, &vault_id);
	print_open(&store, &vault, session);

	if !watch {
		return Ok(());
	}

	let mut changes = store.subscribe();
	let poller = spawn_pending_poller(
		client,
		store.clone(),
		backend,
		chain,
		vault_id.clone(),
		session.config.polling.clone(),
	);
	log_info!("👀 Watching '{}', press Ctrl-C to stop", vault.name);

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			changed = changes.changed() => {
				if changed.is_err() {
					break;
				}
				log_print!("");
				print_drift_notice(&store, &vault_id);
				print_open(&store, &vault, session);
			}
		}
	}
	poller.abort();
	Ok(())
}

fn print_open(store: &VaultStore, vault: &MultisigConfig, session: &Session) {
	let open: Vec<TransactionRecord> = store.with_state(|s| {
		s.transactions
			.iter()
			.filter(|t| t.multisig_id == vault.id && t.is_open())
			.cloned()
			.collect()
	});

	log_print!("📋 {} open transaction(s) for '{}'", open.len().to_string().bright_yellow(), vault.name);
	for record in open {
		let status = match record.status {
			TxStatus::Draft => "draft".dimmed().to_string(),
			_ => "pending".bright_cyan().to_string(),
		};
		log_print!("");
		log_print!("   {:?} [{}]", record.hash, status);
		log_print!("   {} - {}", record.kind.name().bright_yellow(), record.description);
		log_print!(
			"   Approvals: {}/{}",
			record.approvals.approved_count(),
			vault.threshold()
		);
		for (signer, approved) in record.approvals.iter() {
			log_verbose!("     {} {}", if approved { "✅" } else { "⏳" }, signer);
		}
		if let Some(depositor) = record.depositor {
			log_verbose!("   Depositor: {}", session.display(&depositor));
		}
		if let Some(creator) = &record.created_by {
			log_verbose!("   Created by: {}", creator);
		}
	}
}
