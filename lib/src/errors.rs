use aide::OperationOutput;
use axum::{
	extract::multipart::MultipartError,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use cropdoc_core::http::ErrorResponse;

use crate::runner::Error as RunnerError;

#[derive(Debug)]
pub struct HTTPError {
	message: String,
	status_code: StatusCode,
}

impl HTTPError {
	pub fn new(message: &str) -> Self {
		Self {
			message: message.to_string(),
			status_code: StatusCode::UNPROCESSABLE_ENTITY,
		}
	}

	pub const fn with_status(mut self, status_code: StatusCode) -> Self {
		self.status_code = status_code;
		self
	}
}

impl IntoResponse for HTTPError {
	fn into_response(self) -> Response {
		(
			self.status_code,
			Json(ErrorResponse {
				error: self.message,
			}),
		)
			.into_response()
	}
}

impl OperationOutput for HTTPError {
	type Inner = Self;
}

impl From<RunnerError> for HTTPError {
	fn from(e: RunnerError) -> Self {
		match e {
			RunnerError::Pipeline(e) if e.is_client_fault() => {
				tracing::debug!("Rejected upload: {e}");
				Self::new(&e.to_string())
			},
			RunnerError::Pipeline(e) => {
				tracing::error!(stage = ?e.stage(), "{e}");
				Self::new(&e.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR)
			},
			RunnerError::Crashed => {
				Self::new(&e.to_string()).with_status(StatusCode::INTERNAL_SERVER_ERROR)
			},
			RunnerError::Closed => {
				Self::new(&e.to_string()).with_status(StatusCode::SERVICE_UNAVAILABLE)
			},
		}
	}
}

impl From<MultipartError> for HTTPError {
	fn from(e: MultipartError) -> Self {
		tracing::debug!("Malformed multipart body: {e}");
		let status_code = match e.status() {
			StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
			_ => StatusCode::UNPROCESSABLE_ENTITY,
		};

		Self::new(&e.body_text()).with_status(status_code)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cropdoc_core::{Error, Stage};

	#[test]
	fn client_faults_map_to_unprocessable_entity() {
		let error = HTTPError::from(RunnerError::Pipeline(Error::Decode(
			"unexpected end of file".to_string(),
		)));

		assert_eq!(error.status_code, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(error.message, "Failed to decode image: unexpected end of file");
	}

	#[test]
	fn server_faults_map_to_internal_server_error() {
		let error = HTTPError::from(RunnerError::Pipeline(Error::Inference {
			stage: Stage::Classifier,
			source: anyhow::anyhow!("tensor shape mismatch"),
		}));

		assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(
			HTTPError::from(RunnerError::Crashed).status_code,
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn shutdown_maps_to_service_unavailable() {
		assert_eq!(
			HTTPError::from(RunnerError::Closed).status_code,
			StatusCode::SERVICE_UNAVAILABLE
		);
	}
}
