use aide::axum::{routing::post, ApiRouter};
use axum::{
	extract::{multipart::MultipartRejection, Multipart},
	Extension,
};
use axum_jsonschema::Json;
use cropdoc_core::http::PredictionResponse;

use crate::{errors::HTTPError, runner::Runner};

/// Multipart field carrying the uploaded image.
const FILE_FIELD: &str = "file";

pub fn handler() -> ApiRouter {
	ApiRouter::new().api_route("/predict", post(predict))
}

async fn predict(
	Extension(runner): Extension<Runner>,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, HTTPError> {
	let mut multipart = multipart.map_err(|e| HTTPError::new(&e.body_text()))?;

	let upload = loop {
		let Some(field) = multipart.next_field().await? else {
			tracing::debug!("Request had no {FILE_FIELD} field");
			return Err(HTTPError::new("No file uploaded"));
		};

		if field.name() == Some(FILE_FIELD) {
			break field.bytes().await?;
		}
	};

	tracing::debug!("Received {} byte upload", upload.len());
	let (result, predict_time) = runner.run(upload).await?;
	tracing::debug!(
		is_leaf = result.is_leaf(),
		"Prediction completed in {predict_time:?}"
	);

	Ok(Json(result.into()))
}
