use std::{fmt, sync::Arc};

use anyhow::Result;

use crate::{
	tensor::{ImageTensor, TENSOR_SHAPE},
	OutputConvention, StartupError,
};

/// Shape and element type of a model input or output. `None` marks a symbolic dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
	pub shape: Vec<Option<usize>>,
	pub dtype: String,
}

impl fmt::Display for TensorSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let dims = self
			.shape
			.iter()
			.map(|dim| dim.map_or_else(|| "?".to_string(), |dim| dim.to_string()))
			.collect::<Vec<_>>()
			.join(", ");

		write!(f, "{}[{dims}]", self.dtype)
	}
}

/// The declared input and output of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
	pub input: TensorSpec,
	pub output: TensorSpec,
}

/// A loaded inference artifact.
///
/// Implementations are shared across concurrent requests, so `forward` takes `&self` and must not
/// let concurrent calls observe each other's buffers. Runtimes whose interpreters are not
/// reentrant have to serialize access internally.
pub trait Model: Send + Sync {
	/// Human readable identifier, used in logs and errors.
	fn name(&self) -> &str;

	fn signature(&self) -> &Signature;

	/// Run a forward pass and return the first output, flattened.
	///
	/// # Errors
	///
	/// Returns an error if the runtime fails to execute the model.
	fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}

impl<T: Model + ?Sized> Model for Arc<T> {
	fn name(&self) -> &str {
		(**self).name()
	}

	fn signature(&self) -> &Signature {
		(**self).signature()
	}

	fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>> {
		(**self).forward(input)
	}
}

/// A model together with the output convention derived from its signature.
///
/// The convention is computed once, here, and cannot change for the lifetime of the handle.
pub struct ModelHandle {
	model: Box<dyn Model>,
	convention: OutputConvention,
}

impl ModelHandle {
	/// Wrap a loaded model, validating its input and deriving its output convention.
	///
	/// # Errors
	///
	/// Returns [`StartupError::Signature`] if the model does not accept a `(1, 224, 224, 3)`
	/// input, or [`StartupError::Convention`] if its output shape cannot be interpreted.
	pub fn new(model: impl Model + 'static) -> Result<Self, StartupError> {
		let signature = model.signature();

		let accepts_image = signature.input.shape.len() == TENSOR_SHAPE.len()
			&& signature
				.input
				.shape
				.iter()
				.zip(TENSOR_SHAPE)
				.all(|(declared, expected)| declared.map_or(true, |dim| dim == expected));

		if !accepts_image {
			return Err(StartupError::Signature {
				model: model.name().to_string(),
				reason: format!(
					"expected input shape [1, 224, 224, 3], found {}",
					signature.input
				),
			});
		}

		let convention = OutputConvention::derive(&signature.output.shape)?;
		tracing::info!(
			"Loaded model {}: input {}, output {}, {convention}",
			model.name(),
			signature.input,
			signature.output
		);

		Ok(Self {
			model: Box::new(model),
			convention,
		})
	}

	#[must_use]
	pub fn name(&self) -> &str {
		self.model.name()
	}

	#[must_use]
	pub fn signature(&self) -> &Signature {
		self.model.signature()
	}

	#[must_use]
	pub const fn convention(&self) -> OutputConvention {
		self.convention
	}

	/// Run the model and check the output row has the width its convention expects.
	///
	/// # Errors
	///
	/// Returns an error if the forward pass fails or produces a row of the wrong width.
	pub fn run(&self, input: &ImageTensor) -> Result<Vec<f32>> {
		let row = self.model.forward(input)?;

		anyhow::ensure!(
			row.len() == self.convention.width(),
			"model {} produced {} outputs, expected {}",
			self.name(),
			row.len(),
			self.convention.width()
		);

		Ok(row)
	}
}

impl fmt::Debug for ModelHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelHandle")
			.field("name", &self.name())
			.field("signature", self.signature())
			.field("convention", &self.convention)
			.finish()
	}
}
