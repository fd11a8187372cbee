#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::Result;
use clap::Parser;
use cropdoc::ModelArgs;

mod commands;

/// Diagnose crop diseases from leaf photographs without running the server
#[derive(Debug, Parser)]
#[command(name = "cropdoc", version, about)]
struct Cli {
	#[command(flatten)]
	models: ModelArgs,

	#[command(subcommand)]
	command: commands::Command,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	cropdoc::init_tracing();

	commands::exec(&cli.models, cli.command)
}
