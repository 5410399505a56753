/*!
 * Signet - command line front-end for Signet multisig vaults
 *
 * Decode and classify vault transactions, derive multisig addresses, inspect pending
 * approvals and plan the next multisig call for a signer.
 */

use clap::Parser;
use colored::Colorize;
use signet_vault::{cli, log, log_error, log_print, log_verbose};

#[derive(Parser)]
#[command(name = "signet")]
#[command(author = "Signet Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command line interface for Signet multisig vaults", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: cli::Commands,

	/// Enable verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	/// Chain id from the configuration
	#[arg(long, global = true, default_value = "polkadot")]
	chain: String,

	/// Node endpoint URL (defaults to the chain's configured endpoint)
	#[arg(long, global = true)]
	node_url: Option<String>,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	log::set_verbose(cli.verbose);
	env_logger::Builder::new()
		.filter_level(if cli.verbose { ::log::LevelFilter::Debug } else { ::log::LevelFilter::Warn })
		.parse_default_env()
		.init();

	log_verbose!("{}", "🔏 Signet".bright_cyan().bold());
	log_verbose!("");

	let start_time = std::time::Instant::now();
	let result = cli::execute_command(cli.command, &cli.chain, cli.node_url).await;
	let elapsed = start_time.elapsed();

	match result {
		Ok(_) => {
			log_verbose!("");
			log_verbose!("⏱️  Completed in {:.2}s", elapsed.as_secs_f64());
		},
		Err(e) => {
			if let Some(message) = e.user_message() {
				log_error!("{}", message);
			}
			log_print!("⏱️  Failed after {:.2}s", elapsed.as_secs_f64());
			std::process::exit(1);
		},
	}
}
