use std::path::Path;

use anyhow::Result;
use tract_onnx::{prelude::*, tract_core::internal::DimLike};
use tract_tflite::Tflite;

use crate::{
	model::{Model, Signature, TensorSpec},
	tensor::{ImageTensor, TENSOR_SHAPE},
	StartupError,
};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// On-disk model formats understood by [`TractModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
	/// Full precision ONNX export.
	Onnx,
	/// TensorFlow Lite flatbuffer, possibly quantized.
	Tflite,
}

impl ModelFormat {
	/// Pick the format from the file extension.
	///
	/// # Errors
	///
	/// Returns [`StartupError::UnsupportedFormat`] for anything other than `.onnx` or `.tflite`.
	pub fn from_path(path: &Path) -> Result<Self, StartupError> {
		match path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(str::to_ascii_lowercase)
			.as_deref()
		{
			Some("onnx") => Ok(Self::Onnx),
			Some("tflite") => Ok(Self::Tflite),
			_ => Err(StartupError::UnsupportedFormat(path.to_path_buf())),
		}
	}
}

/// A model executed by tract.
///
/// `SimplePlan::run` allocates fresh execution state on every call, so one plan can serve
/// concurrent forward passes without locking.
pub struct TractModel {
	name: String,
	plan: Plan,
	signature: Signature,
}

impl TractModel {
	/// Load and optimize the model at `path`.
	///
	/// # Errors
	///
	/// Returns [`StartupError::MissingArtifact`] if the file does not exist,
	/// [`StartupError::UnsupportedFormat`] for unknown extensions, [`StartupError::Load`] if tract
	/// rejects the model, or [`StartupError::Signature`] if it does not take an f32 image.
	pub fn load(path: &Path) -> Result<Self, StartupError> {
		if !path.is_file() {
			return Err(StartupError::MissingArtifact(path.to_path_buf()));
		}

		let format = ModelFormat::from_path(path)?;
		tracing::info!("Loading {format:?} model from {}", path.display());

		let load_error = |source: anyhow::Error| StartupError::Load {
			path: path.to_path_buf(),
			source,
		};

		let model = match format {
			ModelFormat::Onnx => tract_onnx::onnx()
				.model_for_path(path)
				.and_then(|model| {
					model.with_input_fact(
						0,
						InferenceFact::dt_shape(f32::datum_type(), TENSOR_SHAPE.to_vec()),
					)
				})
				.and_then(|model| model.into_optimized()),
			ModelFormat::Tflite => Tflite::default()
				.model_for_path(path)
				.and_then(|model| model.into_optimized()),
		}
		.map_err(load_error)?;

		let name = model_name(path);
		let input = model.input_fact(0).map_err(load_error)?;
		let signature = Signature {
			input: tensor_spec(input),
			output: tensor_spec(model.output_fact(0).map_err(load_error)?),
		};

		if input.datum_type != f32::datum_type() {
			return Err(StartupError::Signature {
				model: name,
				reason: format!("expected an F32 input, found {}", signature.input),
			});
		}

		let plan = model.into_runnable().map_err(load_error)?;

		Ok(Self {
			name,
			plan,
			signature,
		})
	}
}

impl Model for TractModel {
	fn name(&self) -> &str {
		&self.name
	}

	fn signature(&self) -> &Signature {
		&self.signature
	}

	fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>> {
		let tensor = Tensor::from_shape(&input.shape(), input.as_slice())?;
		let outputs = self.plan.run(tvec!(tensor.into()))?;

		let output = outputs
			.first()
			.ok_or_else(|| anyhow::anyhow!("model {} produced no outputs", self.name))?;

		// Quantized models may emit integer outputs.
		let output = output.cast_to::<f32>()?;

		Ok(output.as_slice::<f32>()?.to_vec())
	}
}

fn tensor_spec(fact: &TypedFact) -> TensorSpec {
	TensorSpec {
		shape: fact.shape.iter().map(|dim| dim.to_usize().ok()).collect(),
		dtype: format!("{:?}", fact.datum_type),
	}
}

fn model_name(path: &Path) -> String {
	path.file_name().map_or_else(
		|| path.display().to_string(),
		|name| name.to_string_lossy().into_owned(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{tensor::tests::encode, ModelHandle, OutputConvention};
	use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
	use prost::Message;
	use std::{path::PathBuf, thread};
	use tract_onnx::pb::{
		attribute_proto::AttributeType,
		tensor_proto::DataType,
		tensor_shape_proto::{dimension::Value as Dim, Dimension},
		type_proto, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
		TensorShapeProto, TypeProto, ValueInfoProto,
	};

	fn value_info(name: &str, shape: &[i64]) -> ValueInfoProto {
		ValueInfoProto {
			name: name.to_string(),
			r#type: Some(TypeProto {
				value: Some(type_proto::Value::TensorType(type_proto::Tensor {
					elem_type: DataType::Float as i32,
					shape: Some(TensorShapeProto {
						dim: shape
							.iter()
							.map(|&dim| Dimension {
								value: Some(Dim::DimValue(dim)),
								..Dimension::default()
							})
							.collect(),
					}),
				})),
				..TypeProto::default()
			}),
			..ValueInfoProto::default()
		}
	}

	/// Writes an ONNX graph averaging each channel of the image, so its output row is the mean
	/// red, green and blue value.
	fn channel_mean_onnx() -> PathBuf {
		let node = NodeProto {
			input: vec!["image".to_string()],
			output: vec!["means".to_string()],
			op_type: "ReduceMean".to_string(),
			attribute: vec![
				AttributeProto {
					name: "axes".to_string(),
					r#type: AttributeType::Ints as i32,
					ints: vec![1, 2],
					..AttributeProto::default()
				},
				AttributeProto {
					name: "keepdims".to_string(),
					r#type: AttributeType::Int as i32,
					i: 0,
					..AttributeProto::default()
				},
			],
			..NodeProto::default()
		};

		let model = ModelProto {
			ir_version: 8,
			opset_import: vec![OperatorSetIdProto {
				domain: String::new(),
				version: 13,
			}],
			graph: Some(GraphProto {
				name: "channel_mean".to_string(),
				node: vec![node],
				input: vec![value_info("image", &[1, 224, 224, 3])],
				output: vec![value_info("means", &[1, 3])],
				..GraphProto::default()
			}),
			..ModelProto::default()
		};

		let path = std::env::temp_dir().join(format!(
			"cropdoc-channel-mean-{}.onnx",
			std::process::id()
		));
		std::fs::write(&path, model.encode_to_vec()).unwrap();

		path
	}

	#[test]
	fn runs_onnx_models() {
		let path = channel_mean_onnx();
		let model = TractModel::load(&path);
		std::fs::remove_file(&path).unwrap();

		let handle = ModelHandle::new(model.unwrap()).unwrap();
		assert_eq!(handle.signature().input.to_string(), "F32[1, 224, 224, 3]");
		assert_eq!(handle.signature().output.to_string(), "F32[1, 3]");
		assert_eq!(
			handle.convention(),
			OutputConvention::Multiclass {
				positive_index: 0,
				classes: 3
			}
		);

		let png = encode(
			DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([255, 0, 51]))),
			ImageOutputFormat::Png,
		);
		let tensor = ImageTensor::from_bytes(&png).unwrap();
		let row = handle.run(&tensor).unwrap();

		for (mean, expected) in row.iter().zip([1.0, 0.0, 0.2]) {
			assert!((mean - expected).abs() < 1e-3, "{row:?}");
		}

		// one plan serves concurrent forward passes
		let rows = thread::scope(|scope| {
			let workers: Vec<_> = (0..8)
				.map(|_| scope.spawn(|| handle.run(&tensor).unwrap()))
				.collect();

			workers
				.into_iter()
				.map(|worker| worker.join().unwrap())
				.collect::<Vec<_>>()
		});

		assert!(rows.iter().all(|other| *other == row));
	}

	#[test]
	fn picks_format_from_extension() {
		assert_eq!(
			ModelFormat::from_path(Path::new("model/model.tflite")).unwrap(),
			ModelFormat::Tflite
		);
		assert_eq!(
			ModelFormat::from_path(Path::new("/srv/Gate.ONNX")).unwrap(),
			ModelFormat::Onnx
		);
		assert!(matches!(
			ModelFormat::from_path(Path::new("model/Model.hdf5")),
			Err(StartupError::UnsupportedFormat(_))
		));
		assert!(ModelFormat::from_path(Path::new("model")).is_err());
	}

	#[test]
	fn missing_files_are_reported_before_parsing() {
		let error = TractModel::load(Path::new("/nonexistent/model.onnx")).err().unwrap();

		assert!(matches!(error, StartupError::MissingArtifact(_)));
	}

	#[test]
	fn garbage_files_fail_to_load() {
		let path = std::env::temp_dir().join(format!("cropdoc-garbage-{}.onnx", std::process::id()));
		std::fs::write(&path, b"not a protobuf").unwrap();

		let result = TractModel::load(&path);
		std::fs::remove_file(&path).unwrap();

		assert!(matches!(result, Err(StartupError::Load { .. })));
	}
}
