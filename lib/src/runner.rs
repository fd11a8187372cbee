use atomic_enum::atomic_enum;
use axum::{body::Bytes, Extension};
use cropdoc_core::{InferencePipeline, PredictionResult};
use schemars::JsonSchema;
use std::{
	sync::{atomic::Ordering, Arc},
	time::Duration,
};
use tokio::{sync::Semaphore, task};

use crate::helpers::with_timing;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Server is shutting down")]
	Closed,

	#[error("Prediction crashed")]
	Crashed,

	#[error(transparent)]
	Pipeline(#[from] cropdoc_core::Error),
}

#[atomic_enum]
#[derive(serde::Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
	Ready,
	Busy,
	ShuttingDown,
}

/// Runs predictions on the blocking pool, at most `workers` at a time.
#[derive(Clone)]
pub struct Runner {
	pipeline: Arc<InferencePipeline>,
	permits: Arc<Semaphore>,
	health: Arc<AtomicHealth>,
	workers: usize,
}

impl Runner {
	#[must_use]
	pub fn new(pipeline: InferencePipeline, workers: usize) -> Self {
		let workers = workers.max(1);

		Self {
			workers,
			pipeline: Arc::new(pipeline),
			permits: Arc::new(Semaphore::new(workers)),
			health: Arc::new(AtomicHealth::new(Health::Ready)),
		}
	}

	/// Diagnose an uploaded image, returning the result and how long the pipeline took.
	///
	/// # Errors
	///
	/// Returns [`Error::Closed`] once shutdown has started, [`Error::Crashed`] if the pipeline
	/// panicked, and [`Error::Pipeline`] for any error the pipeline reports.
	pub async fn run(&self, bytes: Bytes) -> Result<(PredictionResult, Duration), Error> {
		let permit = self
			.permits
			.clone()
			.acquire_owned()
			.await
			.map_err(|_| Error::Closed)?;

		let pipeline = self.pipeline.clone();
		let (result, predict_time) = task::spawn_blocking(move || {
			let _permit = permit;
			with_timing(|| pipeline.predict(&bytes))
		})
		.await
		.map_err(|e| {
			tracing::error!("Prediction worker failed: {e}");
			Error::Crashed
		})?;

		Ok((result?, predict_time))
	}

	pub fn health(&self) -> Health {
		match self.health.load(Ordering::SeqCst) {
			Health::ShuttingDown => Health::ShuttingDown,
			_ if self.permits.available_permits() == 0 => Health::Busy,
			_ => Health::Ready,
		}
	}

	/// Stop accepting predictions. Running ones finish normally.
	pub fn shutdown(&self) {
		self.health.store(Health::ShuttingDown, Ordering::SeqCst);
		self.permits.close();
	}

	pub fn in_flight(&self) -> usize {
		self.workers
			.saturating_sub(self.permits.available_permits())
	}

	pub const fn workers(&self) -> usize {
		self.workers
	}

	pub fn pipeline(&self) -> &InferencePipeline {
		&self.pipeline
	}

	pub fn extension(&self) -> Extension<Self> {
		Extension(self.clone())
	}
}
