use std::net::SocketAddr;

use aide::openapi::{self, OpenApi};
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, Extension, Router, Server};
use cropdoc_core::InferencePipeline;
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, routes, runner::Runner, shutdown::Shutdown};

/// Build the HTTP application around a loaded pipeline.
pub fn app(runner: Runner, max_upload_bytes: usize) -> Router {
	let mut openapi = OpenApi {
		info: openapi::Info {
			title: "Crop Disease Detection API".to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			..openapi::Info::default()
		},
		..OpenApi::default()
	};

	let router = routes::handler().finish_api(&mut openapi);

	router
		.layer(Extension(openapi))
		.layer(runner.extension())
		.layer(DefaultBodyLimit::max(max_upload_bytes))
		.layer(CorsLayer::very_permissive())
		.layer(TraceLayer::new_for_http())
}

/// Load the models and serve the API until a shutdown signal arrives.
///
/// # Errors
///
/// This function will return an error if the models cannot be loaded, or if the server fails to start.
pub async fn start(config: Config) -> Result<()> {
	let shutdown = Shutdown::new()?;
	let pipeline_config = config.models.pipeline_config()?;

	tracing::info!(
		"Loading disease model from {}",
		pipeline_config.disease_model.display()
	);
	let pipeline =
		task::spawn_blocking(move || InferencePipeline::load(&pipeline_config)).await??;

	let runner = Runner::new(pipeline, config.workers());
	let addr = SocketAddr::new(config.host, config.port);
	let app = app(runner.clone(), config.max_upload_bytes);

	tracing::info!(
		"Starting server on {addr} with {} workers...",
		runner.workers()
	);

	let signal = shutdown.handle();
	Server::try_bind(&addr)?
		.serve(app.into_make_service())
		.with_graceful_shutdown(async move {
			signal.await;
			runner.shutdown();
			tracing::info!("Draining in-flight predictions");
		})
		.await?;

	tracing::info!("Server stopped");

	Ok(())
}
