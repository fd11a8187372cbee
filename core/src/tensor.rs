use image::{
	error::{ImageError, UnsupportedErrorKind},
	imageops::FilterType,
};

use crate::Error;

/// Side length of the square image both models are trained on.
pub const IMAGE_SIZE: usize = 224;
/// RGB.
pub const CHANNELS: usize = 3;
/// Logical NHWC shape of every [`ImageTensor`].
pub const TENSOR_SHAPE: [usize; 4] = [1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS];

/// A normalized image, ready to be fed to a model.
///
/// Values are laid out NHWC with a batch of one, RGB channel order, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
	data: Box<[f32]>,
}

impl ImageTensor {
	/// Decode an encoded image and normalize it for inference.
	///
	/// The image is converted to RGB and resized to 224x224 with a bilinear filter. Aspect ratio is
	/// not preserved, matching how the models were trained.
	///
	/// # Errors
	///
	/// Returns [`Error::Decode`] if the bytes are not a supported image, or
	/// [`Error::UnsupportedColorSpace`] if the decoder cannot represent its color type.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
		let image = image::load_from_memory(bytes).map_err(decode_error)?;

		tracing::trace!(
			"Decoded {}x{} image ({:?})",
			image.width(),
			image.height(),
			image.color()
		);

		#[allow(clippy::cast_possible_truncation)]
		let rgb = image
			.resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle)
			.to_rgb8();

		let data = rgb
			.into_raw()
			.into_iter()
			.map(|value| f32::from(value) / 255.0)
			.collect();

		Ok(Self { data })
	}

	#[cfg(any(test, feature = "testing"))]
	pub(crate) fn zeros() -> Self {
		Self {
			data: vec![0.0; TENSOR_SHAPE.iter().product()].into_boxed_slice(),
		}
	}

	#[must_use]
	pub const fn shape(&self) -> [usize; 4] {
		TENSOR_SHAPE
	}

	/// The flattened NHWC values.
	#[must_use]
	pub fn as_slice(&self) -> &[f32] {
		&self.data
	}
}

fn decode_error(error: ImageError) -> Error {
	match error {
		ImageError::Unsupported(ref unsupported)
			if matches!(unsupported.kind(), UnsupportedErrorKind::Color(_)) =>
		{
			Error::UnsupportedColorSpace(error.to_string())
		},
		error => Error::Decode(error.to_string()),
	}
}
