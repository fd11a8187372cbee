use std::{collections::HashSet, fs, path::Path};

use crate::StartupError;

/// Separates the crop from the disease in a taxonomy label.
pub const DELIMITER: &str = "___";
/// Disease reported for labels that lack a [`DELIMITER`].
pub const UNKNOWN_DISEASE: &str = "Unknown";

/// The PlantVillage classes, in the disease classifier's training-time output order.
///
/// This order is part of the model artifact: it must be changed together with the model, never on
/// its own.
pub const PLANT_VILLAGE: [&str; 38] = [
	"Apple___Apple_scab",
	"Apple___Black_rot",
	"Apple___Cedar_apple_rust",
	"Apple___healthy",
	"Blueberry___healthy",
	"Cherry_(including_sour)___Powdery_mildew",
	"Cherry_(including_sour)___healthy",
	"Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
	"Corn_(maize)___Common_rust_",
	"Corn_(maize)___Northern_Leaf_Blight",
	"Corn_(maize)___healthy",
	"Grape___Black_rot",
	"Grape___Esca_(Black_Measles)",
	"Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
	"Grape___healthy",
	"Orange___Haunglongbing_(Citrus_greening)",
	"Peach___Bacterial_spot",
	"Peach___healthy",
	"Pepper,_bell___Bacterial_spot",
	"Pepper,_bell___healthy",
	"Potato___Early_blight",
	"Potato___Late_blight",
	"Potato___healthy",
	"Raspberry___healthy",
	"Soybean___healthy",
	"Squash___Powdery_mildew",
	"Strawberry___Leaf_scorch",
	"Strawberry___healthy",
	"Tomato___Bacterial_spot",
	"Tomato___Early_blight",
	"Tomato___Late_blight",
	"Tomato___Leaf_Mold",
	"Tomato___Septoria_leaf_spot",
	"Tomato___Spider_mites Two-spotted_spider_mite",
	"Tomato___Target_Spot",
	"Tomato___Tomato_Yellow_Leaf_Curl_Virus",
	"Tomato___Tomato_mosaic_virus",
	"Tomato___healthy",
];

/// Ordered class names; position `i` names the classifier's output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTaxonomy {
	labels: Vec<String>,
}

impl LabelTaxonomy {
	/// Build a taxonomy from an ordered list of labels.
	///
	/// # Errors
	///
	/// Returns [`StartupError::Labels`] if the list is empty or contains duplicates.
	pub fn new(labels: Vec<String>) -> Result<Self, StartupError> {
		if labels.is_empty() {
			return Err(StartupError::Labels("no labels".to_string()));
		}

		{
			let mut seen = HashSet::with_capacity(labels.len());
			if let Some(duplicate) = labels.iter().find(|label| !seen.insert(label.as_str())) {
				return Err(StartupError::Labels(format!(
					"duplicate label {duplicate:?}"
				)));
			}
		}

		for label in labels.iter().filter(|label| !label.contains(DELIMITER)) {
			tracing::warn!("Label {label:?} has no {DELIMITER:?} delimiter, its disease will be reported as {UNKNOWN_DISEASE:?}");
		}

		Ok(Self { labels })
	}

	/// Load a taxonomy from a JSON array of strings.
	///
	/// # Errors
	///
	/// Returns [`StartupError::Labels`] if the file cannot be read, is not a JSON array of strings,
	/// or fails [`Self::new`].
	pub fn from_json_file(path: &Path) -> Result<Self, StartupError> {
		let contents = fs::read_to_string(path).map_err(|e| {
			StartupError::Labels(format!("failed to read {}: {e}", path.display()))
		})?;

		let labels: Vec<String> = serde_json::from_str(&contents).map_err(|e| {
			StartupError::Labels(format!("failed to parse {}: {e}", path.display()))
		})?;

		Self::new(labels)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.labels.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<&str> {
		self.labels.get(index).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(String::as_str)
	}
}

impl Default for LabelTaxonomy {
	fn default() -> Self {
		Self {
			labels: PLANT_VILLAGE.iter().map(ToString::to_string).collect(),
		}
	}
}

/// A taxonomy label split into its crop and human readable disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParts<'a> {
	pub crop: &'a str,
	/// The disease exactly as it appears in the label.
	pub disease_raw: Option<&'a str>,
	/// `disease_raw` with underscores replaced by spaces, title cased.
	pub disease: String,
}

impl<'a> LabelParts<'a> {
	#[must_use]
	pub fn parse(label: &'a str) -> Self {
		label.split_once(DELIMITER).map_or_else(
			|| Self {
				crop: label,
				disease_raw: None,
				disease: UNKNOWN_DISEASE.to_string(),
			},
			|(crop, disease_raw)| Self {
				crop,
				disease_raw: Some(disease_raw),
				disease: title_case(&disease_raw.replace('_', " ")),
			},
		)
	}
}

/// Upper-case the first letter of every word and lower-case the rest. A word starts at any
/// letter that follows a non-letter, so `two-spotted (black` becomes `Two-Spotted (Black`.
///
/// Small words are capitalized too. The `titlecase` crate keeps `of` or `the` lower-case, which
/// would rename diseases clients already match on.
#[must_use]
pub fn title_case(text: &str) -> String {
	let mut titled = String::with_capacity(text.len());
	let mut in_word = false;

	for c in text.chars() {
		if c.is_alphabetic() {
			if in_word {
				titled.extend(c.to_lowercase());
			} else {
				titled.extend(c.to_uppercase());
			}
		} else {
			titled.push(c);
		}

		in_word = c.is_alphabetic();
	}

	titled
}
