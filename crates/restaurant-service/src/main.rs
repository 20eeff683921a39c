//! Entry point for the restaurant ordering service.
//!
//! Loads the configuration, builds the engine with the configured storage
//! backend and runs a single command against it, printing the result as JSON.

use clap::Parser;
use restaurant_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod factory_registry;

use commands::Command;

/// Command-line arguments for the restaurant service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "RESTAURANT_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// stdout carries the command output
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.restaurant.id);

	let engine = factory_registry::build_engine_from_config(config)?;

	match commands::run(&engine, args.command).await {
		Ok(output) => {
			println!("{}", serde_json::to_string_pretty(&output)?);
			Ok(ExitCode::SUCCESS)
		},
		Err(e) => {
			tracing::debug!(error = %e, "Command failed");
			eprintln!("{}", serde_json::to_string_pretty(&e.to_response())?);
			Ok(ExitCode::FAILURE)
		},
	}
}
