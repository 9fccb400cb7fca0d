#![doc = include_str!("../README.md")]

// Core data model
pub mod datatype;
pub mod error;
pub mod image;
pub mod tensor;

// Line primitives and the machinery built on them
pub mod buffer;
pub mod framework;
pub mod iterators;
pub mod pixel_table;

// Consumers and tooling
pub mod config;
pub mod diagnostics;
pub mod filters;

// --- High-level re-exports -------------------------------------------------

pub use crate::datatype::{Bin, DataType, Sample, Value};
pub use crate::error::{Error, Result};
pub use crate::image::{CropLocation, Image, Range};
pub use crate::tensor::{Tensor, TensorShape};

pub use crate::buffer::BoundaryCondition;
pub use crate::framework::{
    one_dimensional_line_filter, separable, SeparableLineFilter, SeparableLineFilterParams, SeparableOption,
    SeparableOptions,
};
pub use crate::pixel_table::{PixelTable, PixelTableOffsets, PixelTableShape};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```
/// use strided_image::prelude::*;
///
/// let img = Image::from_vec(&[4, 2], 1, vec![1u8, 2, 3, 4, 5, 6, 7, 8])?;
/// let view = img.at(&[Range::with_step(0, -1, 2), Range::all()])?;
/// assert_eq!(view.to_vec::<u8>()?, vec![1, 3, 5, 7]);
///
/// let table = PixelTable::new(PixelTableShape::Elliptic, &[5.0, 5.0], 0)?;
/// let offsets = table.prepare(&img)?;
/// assert_eq!(offsets.number_of_pixels(), table.number_of_pixels());
/// # Ok::<(), strided_image::Error>(())
/// ```
pub mod prelude {
    pub use crate::buffer::BoundaryCondition;
    pub use crate::filters::{downsample, gaussian_blur, Pyramid, PyramidOptions};
    pub use crate::framework::{
        separable, SeparableBuffer, SeparableLineFilter, SeparableLineFilterParams, SeparableOption, SeparableOptions,
    };
    pub use crate::pixel_table::{PixelTable, PixelTableShape};
    pub use crate::{DataType, Error, Image, Range, Tensor};
}
