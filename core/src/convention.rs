//! How a model's raw output row is turned into a class decision.
//!
//! The convention is derived from the width of the model's output alone. Nothing in the model
//! artifact says which class is "positive": index [`LEAF_CLASS_INDEX`] is assumed to be the leaf
//! class of the gate model. A gate trained with the opposite class ordering will silently invert
//! every decision, so retrained gate models must keep leaf at index 0 (multiclass) or emit the
//! leaf probability (binary).

use std::fmt;

use crate::StartupError;

/// Output index treated as the positive (leaf) class.
pub const LEAF_CLASS_INDEX: usize = 0;
/// Decision threshold for single-output sigmoid models. Values strictly above it are positive.
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Interpretation rule for a model's output row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputConvention {
	/// A single sigmoid output compared against a threshold.
	Binary { positive_index: usize, threshold: f32 },
	/// `classes` scores; the argmax is the predicted class.
	Multiclass { positive_index: usize, classes: usize },
}

impl OutputConvention {
	/// Derive the convention from a model's declared output shape (`None` marks a symbolic
	/// dimension such as the batch).
	///
	/// Only [`crate::ModelHandle::new`] calls this, once per model.
	///
	/// # Errors
	///
	/// Returns [`StartupError::Convention`] if the trailing dimension is missing, symbolic or zero.
	pub fn derive(output_shape: &[Option<usize>]) -> Result<Self, StartupError> {
		let error = |reason| StartupError::Convention {
			shape: output_shape.to_vec(),
			reason,
		};

		match output_shape.last() {
			None => Err(error("output has no dimensions")),
			Some(None) => Err(error("trailing dimension is not fixed")),
			Some(Some(0)) => Err(error("trailing dimension is zero")),
			Some(Some(1)) => Ok(Self::Binary {
				positive_index: LEAF_CLASS_INDEX,
				threshold: BINARY_THRESHOLD,
			}),
			Some(Some(classes)) => Ok(Self::Multiclass {
				positive_index: LEAF_CLASS_INDEX,
				classes: *classes,
			}),
		}
	}

	/// Number of values in one output row.
	#[must_use]
	pub const fn width(&self) -> usize {
		match self {
			Self::Binary { .. } => 1,
			Self::Multiclass { classes, .. } => *classes,
		}
	}

	/// Whether `row` selects the positive class.
	///
	/// `row` must be [`Self::width`] long.
	#[must_use]
	pub fn is_positive(&self, row: &[f32]) -> bool {
		match *self {
			Self::Binary {
				positive_index,
				threshold,
			} => row.get(positive_index).is_some_and(|value| *value > threshold),
			Self::Multiclass { positive_index, .. } => argmax(row) == Some(positive_index),
		}
	}
}

impl fmt::Display for OutputConvention {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Binary {
				positive_index,
				threshold,
			} => write!(f, "binary (output[{positive_index}] > {threshold})"),
			Self::Multiclass {
				positive_index,
				classes,
			} => write!(f, "multiclass ({classes} classes, positive index {positive_index})"),
		}
	}
}

/// Index of the largest value, ties broken by the lowest index. NaNs never win.
#[must_use]
pub fn argmax(row: &[f32]) -> Option<usize> {
	let mut best: Option<(usize, f32)> = None;

	for (index, &value) in row.iter().enumerate() {
		if value.is_nan() {
			continue;
		}

		match best {
			Some((_, current)) if value <= current => {},
			_ => best = Some((index, value)),
		}
	}

	best.map(|(index, _)| index)
}
