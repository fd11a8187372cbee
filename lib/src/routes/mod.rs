use aide::axum::{routing::get, ApiRouter, IntoApiResponse};
use aide::openapi::OpenApi;
use axum::{Extension, Json};

pub mod predict;
pub mod system;

pub fn handler() -> ApiRouter {
	ApiRouter::new()
		.merge(system::handler())
		.merge(predict::handler())
		.route("/openapi.json", get(openapi))
}

#[allow(clippy::unused_async)]
async fn openapi(Extension(api): Extension<OpenApi>) -> impl IntoApiResponse {
	Json(api)
}
