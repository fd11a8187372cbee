use aide::axum::{routing::get, ApiRouter};
use axum::Extension;
use axum_jsonschema::Json;
use schemars::JsonSchema;

use crate::runner::{Health, Runner};

pub fn handler() -> ApiRouter {
	ApiRouter::new()
		.api_route("/", get(root))
		.api_route("/health-check", get(health_check))
}

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct RootResponse {
	pub message: String,
}

#[allow(clippy::unused_async)]
pub async fn root() -> Json<RootResponse> {
	Json(RootResponse {
		message: "Crop Disease Detection API is running!".to_string(),
	})
}

#[derive(serde::Serialize, JsonSchema)]
pub struct HealthCheck {
	/// Current health status
	pub status: Health,
	/// Whether uploads are checked by a leaf gate before classification
	pub gate_enabled: bool,
	/// Number of disease classes the classifier distinguishes
	pub classes: usize,
	/// Predictions currently running
	pub in_flight: usize,
	/// Predictions allowed to run at once
	pub workers: usize,
}

#[allow(clippy::unused_async)]
pub async fn health_check(Extension(runner): Extension<Runner>) -> Json<HealthCheck> {
	let pipeline = runner.pipeline();

	Json(HealthCheck {
		status: runner.health(),
		gate_enabled: pipeline.gate().is_some(),
		classes: pipeline.classifier().taxonomy().len(),
		in_flight: runner.in_flight(),
		workers: runner.workers(),
	})
}
