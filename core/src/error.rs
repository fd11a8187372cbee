use std::{fmt, path::PathBuf};

/// The pipeline stage that ran a model forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Gate,
	Classifier,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Gate => "leaf gate",
			Self::Classifier => "disease classifier",
		})
	}
}

/// Errors produced while serving a single prediction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to decode image: {0}")]
	Decode(String),

	#[error("Unsupported color space: {0}")]
	UnsupportedColorSpace(String),

	#[error("Inference failed in {stage}: {source}")]
	Inference {
		stage: Stage,
		#[source]
		source: anyhow::Error,
	},
}

impl Error {
	pub(crate) fn inference(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
		Self::Inference {
			stage,
			source: source.into(),
		}
	}

	/// Whether the request itself is at fault (bad upload) rather than the server.
	#[must_use]
	pub const fn is_client_fault(&self) -> bool {
		matches!(self, Self::Decode(_) | Self::UnsupportedColorSpace(_))
	}

	/// The stage that failed, for server-side faults.
	#[must_use]
	pub const fn stage(&self) -> Option<Stage> {
		match self {
			Self::Inference { stage, .. } => Some(*stage),
			Self::Decode(_) | Self::UnsupportedColorSpace(_) => None,
		}
	}
}

/// Errors that prevent the pipeline from being constructed. These are fatal: a process that hits
/// one must not start serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("Model artifact not found at {}", .0.display())]
	MissingArtifact(PathBuf),

	#[error("Unsupported model format for {}: expected a .onnx or .tflite file", .0.display())]
	UnsupportedFormat(PathBuf),

	#[error("Failed to load model {}: {source}", .path.display())]
	Load {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},

	#[error("Model {model} has an unexpected signature: {reason}")]
	Signature { model: String, reason: String },

	#[error("Cannot derive an output convention from output shape {shape:?}: {reason}")]
	Convention {
		shape: Vec<Option<usize>>,
		reason: &'static str,
	},

	#[error("Label taxonomy has {labels} entries but the classifier outputs {outputs} classes")]
	LabelCountMismatch { labels: usize, outputs: usize },

	#[error("Invalid label taxonomy: {0}")]
	Labels(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decode_errors_are_client_faults() {
		assert!(Error::Decode("bad".to_string()).is_client_fault());
		assert!(Error::UnsupportedColorSpace("cmyk".to_string()).is_client_fault());
	}

	#[test]
	fn inference_errors_carry_their_stage() {
		let error = Error::inference(Stage::Gate, anyhow::anyhow!("shape mismatch"));

		assert!(!error.is_client_fault());
		assert_eq!(error.stage(), Some(Stage::Gate));
		assert_eq!(
			error.to_string(),
			"Inference failed in leaf gate: shape mismatch"
		);
	}

	#[test]
	fn label_mismatch_names_both_counts() {
		let error = StartupError::LabelCountMismatch {
			labels: 37,
			outputs: 38,
		};

		assert_eq!(
			error.to_string(),
			"Label taxonomy has 37 entries but the classifier outputs 38 classes"
		);
	}
}
