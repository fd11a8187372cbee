#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! The crop disease inference pipeline.
//!
//! An upload is decoded into an [`ImageTensor`], optionally checked by a [`LeafGate`], and
//! classified by a [`DiseaseClassifier`] into a [`LabelTaxonomy`] label. [`InferencePipeline`]
//! ties the stages together.

pub mod backend;
pub mod classifier;
pub mod convention;
pub mod error;
pub mod gate;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod taxonomy;
pub mod tensor;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{ModelFormat, TractModel};
pub use classifier::{Classification, DiseaseClassifier};
pub use convention::{OutputConvention, BINARY_THRESHOLD, LEAF_CLASS_INDEX};
pub use error::{Error, Stage, StartupError};
pub use gate::LeafGate;
pub use model::{Model, ModelHandle, Signature, TensorSpec};
pub use pipeline::{Diagnosis, InferencePipeline, PipelineConfig, PredictionResult};
pub use taxonomy::{LabelParts, LabelTaxonomy};
pub use tensor::ImageTensor;
