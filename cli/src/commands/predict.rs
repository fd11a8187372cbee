use anyhow::{bail, Result};
use cropdoc::ModelArgs;
use cropdoc_core::{
	http::{ErrorResponse, PredictionResponse},
	InferencePipeline,
};
use serde_json::{json, Value};
use std::{
	fs,
	path::{Path, PathBuf},
};

pub fn handle(models: &ModelArgs, images: &[PathBuf]) -> Result<()> {
	let pipeline = InferencePipeline::load(&models.pipeline_config()?)?;
	let mut failures = 0;

	for image in images {
		let body = match diagnose(&pipeline, image) {
			Ok(response) => serde_json::to_value(response)?,
			Err(response) => {
				failures += 1;
				tracing::debug!("Diagnosis of {} failed: {}", image.display(), response.error);
				serde_json::to_value(response)?
			},
		};

		println!("{}", annotate(&image.display().to_string(), body));
	}

	if failures > 0 {
		bail!("{failures} of {} images could not be diagnosed", images.len());
	}

	Ok(())
}

/// Read and diagnose a single image. Unreadable files fail like undecodable ones, without
/// stopping the rest of the batch.
fn diagnose(
	pipeline: &InferencePipeline,
	image: &Path,
) -> Result<PredictionResponse, ErrorResponse> {
	let bytes = fs::read(image).map_err(|e| ErrorResponse {
		error: format!("Failed to read {}: {e}", image.display()),
	})?;

	pipeline
		.predict(&bytes)
		.map(PredictionResponse::from)
		.map_err(|e| ErrorResponse {
			error: e.to_string(),
		})
}

/// Prefix a response body with the image it describes.
fn annotate(image: &str, body: Value) -> Value {
	let mut annotated = json!({ "image": image });

	if let (Some(annotated), Value::Object(body)) = (annotated.as_object_mut(), body) {
		annotated.extend(body);
	}

	annotated
}
