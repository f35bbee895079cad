//! # RustyAug: composable transforms for learning-pipeline inputs
//!
//! **RustyAug** prepares arrays, images and masks for training. Every
//! transform follows one protocol: a pure `apply` that turns an item into a
//! new item, and a buffered `apply_into` that writes the same result into a
//! caller-owned buffer so a streaming pipeline can run without allocating.
//!
//! ## Usage Example
//!
//! ```
//! use image::Rgb;
//! use ndarray::{ArrayD, IxDyn};
//! use rustyaug::item::{ArrayItem, Image, Item};
//! use rustyaug::transforms::{ImageToTensor, Normalize, Transform, TransformExt};
//!
//! // 1. An already decoded 4x4 RGB image
//! let pixels = ArrayD::from_elem(IxDyn(&[4, 4]), Rgb([0.5f32, 0.25, 1.0]));
//!
//! // 2. Build the pipeline once, reuse it for every item
//! let pipeline = ImageToTensor::<f32>::new().then(Normalize::imagenet());
//!
//! // 3. Channels end up on the last axis, normalized per channel
//! let tensor = pipeline.apply(Image::new(pixels.clone())?)?;
//! assert_eq!(tensor.shape(), &[4, 4, 3]);
//!
//! // 4. Or write into a preallocated buffer
//! let mut buffer = ArrayItem::<f32>::zeros(&[4, 4, 3]);
//! pipeline.apply_into(&mut buffer, Image::new(pixels)?)?;
//! assert_eq!(buffer, tensor);
//! # Ok::<(), rustyaug::error::TransformError>(())
//! ```

// Declare public modules that constitute the core library API.
pub mod error;
pub mod item;
pub mod scalar;
pub mod transforms;

pub use error::{Result, TransformError};
pub use item::{ArrayItem, Image, Item, MaskMulti};
pub use transforms::{Transform, TransformExt};
