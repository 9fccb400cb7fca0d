//! Line filters built on the separable framework: convolution with 1-D taps,
//! integer-factor subsampling, and an image pyramid combining the two.

pub mod convolution;
pub mod pyramid;
pub mod subsample;

pub use self::convolution::{
    gaussian_blur, separable_convolution, ConvolutionFilter, SeparableFilter, StaticSeparableFilter, GAUSSIAN_5TAP,
};
pub use self::pyramid::{build_pyramid, Pyramid, PyramidOptions, PyramidResult};
pub use self::subsample::{downsample, SubsampleFilter};
