//! Main entry point for the `motions` command-line tool.
//!
//! Loads the configuration, builds the workflow service on the configured
//! storage backend, and runs a single command as the given user.

use clap::Parser;
use motion_config::Config;
use motion_core::MotionServiceBuilder;
use std::path::PathBuf;

mod commands;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Acting user, looked up in the [users] section
	#[arg(short, long, env = "MOTIONS_USER")]
	user: String,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// stdout carries command output
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let service = MotionServiceBuilder::new(config.clone())
		.with_default_storages()
		.build()?;

	let user = config.user(&args.user);
	tracing::debug!(user = %user, permissions = user.permissions.len(), "Acting user");

	let output = commands::run(args.command, &service, &user).await?;
	println!("{}", output);
	Ok(())
}
