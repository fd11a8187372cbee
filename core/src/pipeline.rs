use std::path::{Path, PathBuf};

use crate::{
	backend::TractModel, taxonomy::LabelParts, DiseaseClassifier, Error, ImageTensor,
	LabelTaxonomy, LeafGate, ModelHandle, StartupError,
};

/// Where to find the model artifacts, already resolved to concrete paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
	pub disease_model: PathBuf,
	/// Leave unset to disable the leaf gate.
	pub gate_model: Option<PathBuf>,
	/// JSON array overriding the built-in taxonomy.
	pub labels: Option<PathBuf>,
}

impl PipelineConfig {
	/// Resolve relative paths against `home`.
	#[must_use]
	pub fn resolve(
		home: &Path,
		disease_model: &Path,
		gate_model: Option<&Path>,
		labels: Option<&Path>,
	) -> Self {
		Self {
			disease_model: home.join(disease_model),
			gate_model: gate_model.map(|path| home.join(path)),
			labels: labels.map(|path| home.join(path)),
		}
	}
}

/// A diagnosed leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
	/// The full taxonomy label, e.g. `Tomato___Early_blight`.
	pub label: String,
	pub crop: String,
	/// Human readable disease, e.g. `Early Blight`.
	pub disease: String,
	pub confidence: f32,
}

/// Outcome of a prediction. Disease fields only exist for images that passed the leaf gate.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
	NotLeaf,
	Diagnosed(Diagnosis),
}

impl PredictionResult {
	#[must_use]
	pub const fn is_leaf(&self) -> bool {
		matches!(self, Self::Diagnosed(_))
	}

	#[must_use]
	pub const fn diagnosis(&self) -> Option<&Diagnosis> {
		match self {
			Self::Diagnosed(diagnosis) => Some(diagnosis),
			Self::NotLeaf => None,
		}
	}
}

/// Normalizes an upload, optionally gates it, and classifies it.
///
/// Immutable once built; share it between requests behind an `Arc`.
#[derive(Debug)]
pub struct InferencePipeline {
	gate: Option<LeafGate>,
	classifier: DiseaseClassifier,
}

impl InferencePipeline {
	#[must_use]
	pub const fn new(gate: Option<LeafGate>, classifier: DiseaseClassifier) -> Self {
		Self { gate, classifier }
	}

	/// Load every configured artifact from disk.
	///
	/// # Errors
	///
	/// Returns a [`StartupError`] if any artifact is missing or unusable, or the taxonomy does not
	/// match the classifier.
	pub fn load(config: &PipelineConfig) -> Result<Self, StartupError> {
		let taxonomy = config
			.labels
			.as_deref()
			.map_or_else(|| Ok(LabelTaxonomy::default()), LabelTaxonomy::from_json_file)?;

		let classifier = DiseaseClassifier::new(
			ModelHandle::new(TractModel::load(&config.disease_model)?)?,
			taxonomy,
		)?;

		let gate = match &config.gate_model {
			Some(path) => Some(LeafGate::new(ModelHandle::new(TractModel::load(path)?)?)),
			None => {
				tracing::info!("No leaf gate configured, every upload will be classified");
				None
			},
		};

		Ok(Self::new(gate, classifier))
	}

	#[must_use]
	pub const fn gate(&self) -> Option<&LeafGate> {
		self.gate.as_ref()
	}

	#[must_use]
	pub const fn classifier(&self) -> &DiseaseClassifier {
		&self.classifier
	}

	/// Diagnose an encoded image.
	///
	/// # Errors
	///
	/// Returns [`Error::Decode`] or [`Error::UnsupportedColorSpace`] for unusable uploads, and
	/// [`Error::Inference`] if a model fails.
	pub fn predict(&self, bytes: &[u8]) -> Result<PredictionResult, Error> {
		let tensor = ImageTensor::from_bytes(bytes)?;
		tracing::trace!("Normalized {} byte upload", bytes.len());

		if let Some(gate) = &self.gate {
			if !gate.is_leaf(&tensor)? {
				tracing::debug!("Leaf gate rejected upload");
				return Ok(PredictionResult::NotLeaf);
			}

			tracing::trace!("Leaf gate passed upload");
		}

		let classification = self.classifier.classify(&tensor)?;
		let parts = LabelParts::parse(&classification.label);
		tracing::debug!(
			"Classified upload as {} ({:.4})",
			classification.label,
			classification.confidence
		);

		Ok(PredictionResult::Diagnosed(Diagnosis {
			crop: parts.crop.to_string(),
			disease: parts.disease,
			label: classification.label.clone(),
			confidence: classification.confidence,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		tensor::tests::leaf_jpeg,
		testing::{one_hot, StaticModel},
	};
	use std::sync::Arc;

	fn pipeline(gate: Option<Arc<StaticModel>>, disease: Arc<StaticModel>) -> InferencePipeline {
		InferencePipeline::new(
			gate.map(|model| LeafGate::new(ModelHandle::new(model).unwrap())),
			DiseaseClassifier::new(ModelHandle::new(disease).unwrap(), LabelTaxonomy::default())
				.unwrap(),
		)
	}

	#[test]
	fn diagnoses_tomato_early_blight() {
		let disease = StaticModel::new("disease", one_hot(38, 29, 0.87)).shared();
		let gate = StaticModel::new("gate", vec![0.98]).shared();

		let result = pipeline(Some(gate.clone()), disease.clone())
			.predict(&leaf_jpeg(400, 300))
			.unwrap();

		assert!(result.is_leaf());
		let diagnosis = result.diagnosis().unwrap();
		assert_eq!(diagnosis.label, "Tomato___Early_blight");
		assert_eq!(diagnosis.crop, "Tomato");
		assert_eq!(diagnosis.disease, "Early Blight");
		assert!(diagnosis.confidence > 0.0);
		assert_eq!(gate.calls(), 1);
		assert_eq!(disease.calls(), 1);
	}

	#[test]
	fn rejected_uploads_skip_the_classifier() {
		let disease = StaticModel::new("disease", one_hot(38, 29, 0.87)).shared();
		let gate = StaticModel::new("gate", vec![0.1, 0.9]).shared();

		let result = pipeline(Some(gate.clone()), disease.clone())
			.predict(&leaf_jpeg(640, 480))
			.unwrap();

		assert_eq!(result, PredictionResult::NotLeaf);
		assert!(result.diagnosis().is_none());
		assert_eq!(gate.calls(), 1);
		assert_eq!(disease.calls(), 0);
	}

	#[test]
	fn without_a_gate_everything_is_a_leaf() {
		let disease = StaticModel::new("disease", one_hot(38, 3, 0.7)).shared();

		let result = pipeline(None, disease.clone())
			.predict(&leaf_jpeg(100, 100))
			.unwrap();

		assert!(result.is_leaf());
		assert_eq!(result.diagnosis().unwrap().label, "Apple___healthy");
		assert_eq!(result.diagnosis().unwrap().disease, "Healthy");
		assert_eq!(disease.calls(), 1);
	}

	#[test]
	fn corrupted_uploads_are_decode_errors() {
		let disease = StaticModel::new("disease", one_hot(38, 0, 0.9)).shared();
		let gate = StaticModel::new("gate", vec![0.9]).shared();

		let error = pipeline(Some(gate.clone()), disease.clone())
			.predict(&[0xFF, 0xD8, 0x00, 0x13, 0x37])
			.unwrap_err();

		assert!(error.is_client_fault());
		assert_eq!(gate.calls(), 0);
		assert_eq!(disease.calls(), 0);
	}

	#[test]
	fn gate_failures_stop_the_pipeline() {
		let disease = StaticModel::new("disease", one_hot(38, 0, 0.9)).shared();
		let gate = StaticModel::failing("gate", 1, "boom").shared();

		let error = pipeline(Some(gate), disease.clone())
			.predict(&leaf_jpeg(50, 50))
			.unwrap_err();

		assert_eq!(error.stage(), Some(crate::Stage::Gate));
		assert_eq!(disease.calls(), 0);
	}

	#[test]
	fn resolves_relative_paths_against_home() {
		let config = PipelineConfig::resolve(
			Path::new("/opt/cropdoc"),
			Path::new("model/model.tflite"),
			Some(Path::new("/srv/gate.onnx")),
			None,
		);

		assert_eq!(
			config.disease_model,
			PathBuf::from("/opt/cropdoc/model/model.tflite")
		);
		assert_eq!(config.gate_model, Some(PathBuf::from("/srv/gate.onnx")));
		assert_eq!(config.labels, None);
	}

	#[test]
	fn missing_artifacts_abort_loading() {
		let error = InferencePipeline::load(&PipelineConfig {
			disease_model: PathBuf::from("/nonexistent/model.tflite"),
			gate_model: None,
			labels: None,
		})
		.unwrap_err();

		assert!(matches!(error, StartupError::MissingArtifact(_)));
	}
}
