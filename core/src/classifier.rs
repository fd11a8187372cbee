use crate::{
	convention::argmax,
	error::{Error, Stage},
	ImageTensor, LabelTaxonomy, ModelHandle, OutputConvention, StartupError,
};

/// Maximum distance from 1.0 at which an output row is still treated as probabilities.
const PROBABILITY_TOLERANCE: f32 = 1e-3;

/// The top class for an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
	pub index: usize,
	pub label: String,
	/// Probability of `label`, in `[0.0, 1.0]`.
	pub confidence: f32,
}

/// Maps a leaf image to one of the taxonomy's crop/disease labels.
#[derive(Debug)]
pub struct DiseaseClassifier {
	model: ModelHandle,
	taxonomy: LabelTaxonomy,
}

impl DiseaseClassifier {
	/// Pair a model with the taxonomy naming its outputs.
	///
	/// # Errors
	///
	/// Returns [`StartupError::LabelCountMismatch`] unless the model is multiclass with exactly
	/// one output per label.
	pub fn new(model: ModelHandle, taxonomy: LabelTaxonomy) -> Result<Self, StartupError> {
		let outputs = match model.convention() {
			OutputConvention::Multiclass { classes, .. } => classes,
			OutputConvention::Binary { .. } => 1,
		};

		if outputs != taxonomy.len() {
			return Err(StartupError::LabelCountMismatch {
				labels: taxonomy.len(),
				outputs,
			});
		}

		Ok(Self { model, taxonomy })
	}

	#[must_use]
	pub const fn model(&self) -> &ModelHandle {
		&self.model
	}

	#[must_use]
	pub const fn taxonomy(&self) -> &LabelTaxonomy {
		&self.taxonomy
	}

	/// Run the classifier and pick the most likely label.
	///
	/// # Errors
	///
	/// Returns [`Error::Inference`] if the forward pass fails or yields no usable score.
	pub fn classify(&self, tensor: &ImageTensor) -> Result<Classification, Error> {
		let row = self
			.model
			.run(tensor)
			.map_err(|e| Error::inference(Stage::Classifier, e))?;
		let probabilities = to_probabilities(row);

		let index = argmax(&probabilities).ok_or_else(|| {
			Error::inference(
				Stage::Classifier,
				anyhow::anyhow!("classifier output contains no comparable scores"),
			)
		})?;

		// `new` guarantees one label per output.
		let label = self.taxonomy.get(index).ok_or_else(|| {
			Error::inference(
				Stage::Classifier,
				anyhow::anyhow!("no label for class index {index}"),
			)
		})?;

		Ok(Classification {
			index,
			label: label.to_string(),
			confidence: probabilities[index],
		})
	}
}

/// Pass `row` through as-is if it already is a probability distribution, softmax it otherwise.
fn to_probabilities(row: Vec<f32>) -> Vec<f32> {
	let in_range = row.iter().all(|value| (0.0..=1.0).contains(value));
	let sum: f32 = row.iter().sum();

	if in_range && (sum - 1.0).abs() <= PROBABILITY_TOLERANCE {
		return row;
	}

	tracing::trace!("Classifier output is not normalized (sum = {sum}), applying softmax");
	softmax(&row)
}

fn softmax(row: &[f32]) -> Vec<f32> {
	let max = row
		.iter()
		.copied()
		.filter(|value| !value.is_nan())
		.fold(f32::NEG_INFINITY, f32::max);
	let exps = row.iter().map(|value| (value - max).exp()).collect::<Vec<_>>();
	let total: f32 = exps.iter().filter(|value| !value.is_nan()).sum();

	exps.into_iter().map(|value| value / total).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{blank_tensor, one_hot, StaticModel};

	fn classifier(row: Vec<f32>) -> DiseaseClassifier {
		DiseaseClassifier::new(
			ModelHandle::new(StaticModel::new("disease", row)).unwrap(),
			LabelTaxonomy::default(),
		)
		.unwrap()
	}

	#[test]
	fn picks_the_highest_scoring_label() {
		let result = classifier(one_hot(38, 29, 0.91))
			.classify(&blank_tensor())
			.unwrap();

		assert_eq!(result.index, 29);
		assert_eq!(result.label, "Tomato___Early_blight");
		assert!((result.confidence - 0.91).abs() < 1e-6);
	}

	#[test]
	fn ties_go_to_the_lowest_index() {
		let mut row = vec![0.0; 38];
		row[4] = 0.5;
		row[7] = 0.5;

		let result = classifier(row).classify(&blank_tensor()).unwrap();

		assert_eq!(result.label, "Blueberry___healthy");
	}

	#[test]
	fn every_class_yields_a_taxonomy_label() {
		let taxonomy = LabelTaxonomy::default();

		for index in 0..38 {
			let result = classifier(one_hot(38, index, 0.6))
				.classify(&blank_tensor())
				.unwrap();

			assert_eq!(Some(result.label.as_str()), taxonomy.get(index));
			assert!((0.0..=1.0).contains(&result.confidence));
		}
	}

	#[test]
	fn logits_are_softmaxed() {
		let mut row = vec![-2.0; 38];
		row[31] = 6.5;

		let result = classifier(row).classify(&blank_tensor()).unwrap();

		assert_eq!(result.label, "Tomato___Leaf_Mold");
		assert!(result.confidence > 0.9 && result.confidence <= 1.0);
	}

	#[test]
	fn label_count_must_match_outputs() {
		let labels = LabelTaxonomy::default().iter().take(37).map(String::from).collect();

		let error = DiseaseClassifier::new(
			ModelHandle::new(StaticModel::new("disease", vec![0.0; 38])).unwrap(),
			LabelTaxonomy::new(labels).unwrap(),
		)
		.unwrap_err();

		assert!(matches!(
			error,
			StartupError::LabelCountMismatch {
				labels: 37,
				outputs: 38
			}
		));
	}

	#[test]
	fn binary_models_cannot_classify_diseases() {
		let error = DiseaseClassifier::new(
			ModelHandle::new(StaticModel::new("disease", vec![0.4])).unwrap(),
			LabelTaxonomy::default(),
		)
		.unwrap_err();

		assert!(matches!(
			error,
			StartupError::LabelCountMismatch { outputs: 1, .. }
		));
	}

	#[test]
	fn forward_failures_are_propagated() {
		let classifier = DiseaseClassifier::new(
			ModelHandle::new(StaticModel::failing("disease", 38, "shape mismatch")).unwrap(),
			LabelTaxonomy::default(),
		)
		.unwrap();

		let error = classifier.classify(&blank_tensor()).unwrap_err();

		assert_eq!(error.stage(), Some(Stage::Classifier));
		assert!(error.to_string().contains("shape mismatch"));
	}

	#[test]
	fn all_nan_output_is_an_inference_error() {
		let error = classifier(vec![f32::NAN; 38])
			.classify(&blank_tensor())
			.unwrap_err();

		assert_eq!(error.stage(), Some(Stage::Classifier));
	}
}
