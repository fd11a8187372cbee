use std::{
	env,
	net::{IpAddr, Ipv4Addr},
	num::NonZeroUsize,
	path::PathBuf,
	thread,
};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use cropdoc_core::PipelineConfig;

/// Uploads larger than this are rejected with 413 unless overridden.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where the models live. Shared by the server and the command line tool.
#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
	/// Directory relative model paths are resolved against [default: the executable's directory]
	#[arg(long, env = "CROPDOC_HOME")]
	pub home: Option<PathBuf>,

	/// Disease classifier model (.onnx or .tflite)
	#[arg(long, env = "CROPDOC_MODEL", default_value = "model/model.tflite")]
	pub model: PathBuf,

	/// Leaf gate model (.onnx or .tflite). Without it, every upload is classified.
	#[arg(long, env = "CROPDOC_GATE_MODEL")]
	pub gate_model: Option<PathBuf>,

	/// JSON array of labels replacing the built-in PlantVillage taxonomy
	#[arg(long, env = "CROPDOC_LABELS")]
	pub labels: Option<PathBuf>,
}

impl ModelArgs {
	/// The directory model paths are resolved against.
	///
	/// # Errors
	///
	/// Returns an error if no home was given and the executable's location cannot be determined.
	pub fn home(&self) -> Result<PathBuf> {
		if let Some(home) = &self.home {
			return Ok(home.clone());
		}

		let exe = env::current_exe().context("Failed to locate the running executable")?;

		exe.parent()
			.map(PathBuf::from)
			.context("The running executable has no parent directory")
	}

	/// Resolve every path into a [`PipelineConfig`].
	///
	/// # Errors
	///
	/// Returns an error if the home directory cannot be determined.
	pub fn pipeline_config(&self) -> Result<PipelineConfig> {
		Ok(PipelineConfig::resolve(
			&self.home()?,
			&self.model,
			self.gate_model.as_deref(),
			self.labels.as_deref(),
		))
	}
}

/// Crop disease detection API
#[derive(Debug, Clone, Parser)]
#[command(name = "cropdoc-server", version, about)]
pub struct Config {
	/// Address to listen on
	#[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,

	/// Port to listen on
	#[arg(short, long, env = "PORT", default_value_t = 8000)]
	pub port: u16,

	/// Largest accepted upload, in bytes
	#[arg(long, env = "CROPDOC_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
	pub max_upload_bytes: usize,

	/// Predictions allowed to run at once [default: available parallelism]
	#[arg(long, env = "CROPDOC_WORKERS")]
	pub workers: Option<NonZeroUsize>,

	#[command(flatten)]
	pub models: ModelArgs,
}

impl Config {
	#[must_use]
	pub fn workers(&self) -> usize {
		self.workers
			.or_else(|| thread::available_parallelism().ok())
			.map_or(1, NonZeroUsize::get)
	}
}
