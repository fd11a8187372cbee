use crate::{
	error::{Error, Stage},
	ImageTensor, ModelHandle,
};

/// Decides whether an image shows a leaf worth diagnosing.
#[derive(Debug)]
pub struct LeafGate {
	model: ModelHandle,
}

impl LeafGate {
	#[must_use]
	pub const fn new(model: ModelHandle) -> Self {
		Self { model }
	}

	#[must_use]
	pub const fn model(&self) -> &ModelHandle {
		&self.model
	}

	/// Run the gate model and interpret its output with the model's convention.
	///
	/// # Errors
	///
	/// Returns [`Error::Inference`] if the forward pass fails.
	pub fn is_leaf(&self, tensor: &ImageTensor) -> Result<bool, Error> {
		let row = self
			.model
			.run(tensor)
			.map_err(|e| Error::inference(Stage::Gate, e))?;

		let is_leaf = self.model.convention().is_positive(&row);
		tracing::trace!("Leaf gate output {row:?}, is_leaf = {is_leaf}");

		Ok(is_leaf)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{blank_tensor, StaticModel};

	fn gate(row: Vec<f32>) -> LeafGate {
		LeafGate::new(ModelHandle::new(StaticModel::new("gate", row)).unwrap())
	}

	#[test]
	fn binary_gate_uses_threshold() {
		assert!(gate(vec![0.93]).is_leaf(&blank_tensor()).unwrap());
		assert!(!gate(vec![0.5]).is_leaf(&blank_tensor()).unwrap());
		assert!(!gate(vec![0.02]).is_leaf(&blank_tensor()).unwrap());
	}

	#[test]
	fn multiclass_gate_treats_index_zero_as_leaf() {
		assert!(gate(vec![0.8, 0.2]).is_leaf(&blank_tensor()).unwrap());
		assert!(!gate(vec![0.3, 0.7]).is_leaf(&blank_tensor()).unwrap());
		assert!(!gate(vec![0.1, 0.1, 0.8]).is_leaf(&blank_tensor()).unwrap());
	}

	#[test]
	fn forward_failures_are_tagged_with_the_gate_stage() {
		let gate = LeafGate::new(
			ModelHandle::new(StaticModel::failing("gate", 1, "interpreter crashed")).unwrap(),
		);

		let error = gate.is_leaf(&blank_tensor()).unwrap_err();

		assert_eq!(error.stage(), Some(Stage::Gate));
		assert!(!error.is_client_fault());
	}
}
