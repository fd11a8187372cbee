use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::PredictionResult;

/// Message returned when the leaf gate rejects an upload.
pub const NOT_A_LEAF_MESSAGE: &str = "Please upload a leaf image for correct diagnosis";

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PredictionResponse {
	Diagnosed {
		/// Always `true`
		is_leaf: bool,
		/// Full class label, `<Crop>___<Disease>`
		prediction: String,
		crop: String,
		/// Disease in title case
		disease: String,
		/// Probability of the predicted class, between 0 and 1
		confidence: f32,
	},
	Rejected {
		/// Always `false`
		is_leaf: bool,
		message: String,
	},
}

impl From<PredictionResult> for PredictionResponse {
	fn from(result: PredictionResult) -> Self {
		match result {
			PredictionResult::NotLeaf => Self::Rejected {
				is_leaf: false,
				message: NOT_A_LEAF_MESSAGE.to_string(),
			},
			PredictionResult::Diagnosed(diagnosis) => Self::Diagnosed {
				is_leaf: true,
				prediction: diagnosis.label,
				crop: diagnosis.crop,
				disease: diagnosis.disease,
				confidence: diagnosis.confidence,
			},
		}
	}
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
	pub error: String,
}
