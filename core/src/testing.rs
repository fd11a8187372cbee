//! Fixed-output models for exercising the pipeline without an inference runtime.

use std::sync::{
	atomic::{AtomicUsize, Ordering},
	Arc,
};

use anyhow::Result;

use crate::{
	model::{Model, Signature, TensorSpec},
	tensor::{ImageTensor, TENSOR_SHAPE},
};

/// A model that returns the same output row for every input and counts its invocations.
#[derive(Debug)]
pub struct StaticModel {
	name: String,
	row: Vec<f32>,
	signature: Signature,
	failure: Option<String>,
	calls: AtomicUsize,
}

impl StaticModel {
	/// A model whose declared output is `(None, row.len())`.
	#[must_use]
	pub fn new(name: &str, row: Vec<f32>) -> Self {
		Self {
			name: name.to_string(),
			signature: Signature {
				input: TensorSpec {
					shape: TENSOR_SHAPE.into_iter().map(Some).collect(),
					dtype: "F32".to_string(),
				},
				output: TensorSpec {
					shape: vec![None, Some(row.len())],
					dtype: "F32".to_string(),
				},
			},
			row,
			failure: None,
			calls: AtomicUsize::new(0),
		}
	}

	/// A model whose forward pass always fails with `message`.
	#[must_use]
	pub fn failing(name: &str, width: usize, message: &str) -> Self {
		Self {
			failure: Some(message.to_string()),
			..Self::new(name, vec![0.0; width])
		}
	}

	#[must_use]
	pub fn with_input_shape(mut self, shape: Vec<Option<usize>>) -> Self {
		self.signature.input.shape = shape;
		self
	}

	#[must_use]
	pub fn with_output_shape(mut self, shape: Vec<Option<usize>>) -> Self {
		self.signature.output.shape = shape;
		self
	}

	/// Wrap in an `Arc` so the caller can keep a handle for [`Self::calls`] after giving the model
	/// to the pipeline.
	#[must_use]
	pub fn shared(self) -> Arc<Self> {
		Arc::new(self)
	}

	/// Number of forward passes run so far.
	#[must_use]
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Model for StaticModel {
	fn name(&self) -> &str {
		&self.name
	}

	fn signature(&self) -> &Signature {
		&self.signature
	}

	fn forward(&self, _: &ImageTensor) -> Result<Vec<f32>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		if let Some(message) = &self.failure {
			anyhow::bail!("{message}");
		}

		Ok(self.row.clone())
	}
}

/// A one-hot row of `width` values peaking at `index`.
#[must_use]
pub fn one_hot(width: usize, index: usize, confidence: f32) -> Vec<f32> {
	#[allow(clippy::cast_precision_loss)]
	let rest = (1.0 - confidence) / (width.saturating_sub(1).max(1)) as f32;

	(0..width)
		.map(|i| if i == index { confidence } else { rest })
		.collect()
}

/// An all-zero tensor, for calling models directly.
#[must_use]
pub fn blank_tensor() -> ImageTensor {
	ImageTensor::zeros()
}
