use anyhow::Result;
use clap::Subcommand;
use cropdoc::ModelArgs;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Diagnose one or more images and print the result as JSON
	Predict {
		/// Images to diagnose
		#[arg(required = true)]
		images: Vec<PathBuf>,
	},

	/// Show each model's signature and how its output is interpreted
	Inspect,

	/// List the disease classes the classifier predicts
	Labels,
}

mod inspect;
mod labels;
mod predict;

pub fn exec(models: &ModelArgs, command: Command) -> Result<()> {
	match command {
		Command::Predict { images } => predict::handle(models, &images),
		Command::Inspect => inspect::handle(models),
		Command::Labels => labels::handle(models),
	}
}
