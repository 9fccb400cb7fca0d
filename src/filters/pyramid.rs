//! Image pyramid with configurable separable blur and 2× decimation.
//!
//! Design
//! - Level 0 is the input converted to `SFloat`.
//! - Each following level optionally blurs the previous one with the
//!   configured separable filter, then keeps every other pixel along every
//!   dimension (`ceil(size / 2)` samples).
//! - Blur borders follow the configured boundary condition.

use super::convolution::{separable_convolution, ConvolutionFilter, SeparableFilter, StaticSeparableFilter, GAUSSIAN_5TAP};
use super::subsample::downsample;
use crate::buffer::BoundaryCondition;
use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::image::Image;
use log::debug;
use serde::Deserialize;
use std::time::Instant;

/// Options controlling pyramid construction.
#[derive(Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PyramidOptions {
    /// Number of pyramid levels (>= 1).
    pub levels: usize,
    /// Number of initial downscale steps that apply the separable filter.
    ///
    /// `None` applies the filter before every decimation. `Some(0)` skips blur
    /// entirely. `Some(k)` applies the filter for the first `k` downscale
    /// operations.
    pub blur_levels: Option<usize>,
    pub boundary: BoundaryCondition,
    /// Filter used for the separable blur stage.
    #[serde(skip)]
    pub filter: StaticSeparableFilter,
}

impl Default for PyramidOptions {
    fn default() -> Self {
        Self::new(3)
    }
}

impl PyramidOptions {
    pub fn new(levels: usize) -> Self {
        Self {
            levels,
            blur_levels: None,
            boundary: BoundaryCondition::default(),
            filter: GAUSSIAN_5TAP,
        }
    }

    pub fn with_blur_levels(mut self, blur_levels: Option<usize>) -> Self {
        self.blur_levels = blur_levels;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryCondition) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_filter(mut self, filter: StaticSeparableFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl std::fmt::Debug for PyramidOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidOptions")
            .field("levels", &self.levels)
            .field("blur_levels", &self.blur_levels)
            .field("boundary", &self.boundary)
            .field("filter_taps", &self.filter.taps().len())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Pyramid {
    pub levels: Vec<Image>,
}

impl Pyramid {
    pub fn build(image: &Image, options: PyramidOptions) -> Result<Self> {
        if options.levels == 0 {
            return Err(Error::parameter("pyramid requires at least one level"));
        }
        let mut levels = Vec::with_capacity(options.levels);
        levels.push(image.convert(DataType::SFloat)?);
        let filter = ConvolutionFilter::new(&options.filter)?;

        let blur_limit = options.blur_levels.unwrap_or(usize::MAX);
        for lvl in 1..options.levels {
            let prev = &levels[lvl - 1];
            let mut down = Image::default();
            if lvl <= blur_limit {
                let mut blurred = Image::default();
                separable_convolution(prev, &mut blurred, &filter, &[options.boundary], &[])?;
                downsample(&blurred, &mut down, 2)?;
            } else {
                downsample(prev, &mut down, 2)?;
            }
            debug!("pyramid level {lvl}: {:?}", down.sizes());
            levels.push(down);
        }

        Ok(Self { levels })
    }

    pub fn coarsest(&self) -> &Image {
        // `build` guarantees at least one level.
        &self.levels[self.levels.len() - 1]
    }

    /// Scale of level `index` relative to level 0.
    pub fn scale_for_level(&self, index: usize) -> f32 {
        1.0 / (2u32.pow(index as u32) as f32)
    }
}

#[derive(Clone, Debug)]
pub struct PyramidResult {
    pub pyramid: Pyramid,
    pub elapsed_ms: f64,
}

pub fn build_pyramid(image: &Image, options: PyramidOptions) -> Result<PyramidResult> {
    let start = Instant::now();
    let pyramid = Pyramid::build(image, options)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(PyramidResult { pyramid, elapsed_ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_halve_rounding_up() {
        let img = Image::new(&[17, 10], 1, DataType::UInt8).unwrap();
        let pyr = Pyramid::build(&img, PyramidOptions::new(4)).unwrap();
        let sizes: Vec<Vec<usize>> = pyr.levels.iter().map(|l| l.sizes().to_vec()).collect();
        assert_eq!(sizes, vec![vec![17, 10], vec![9, 5], vec![5, 3], vec![3, 2]]);
        assert!(pyr.levels.iter().all(|l| l.data_type() == DataType::SFloat));
        assert_eq!(pyr.scale_for_level(2), 0.25);
        assert_eq!(pyr.coarsest().sizes(), &[3, 2]);
    }

    #[test]
    fn without_blur_levels_are_plain_decimation() {
        let img = Image::from_vec(&[4, 4], 1, (0..16u8).collect()).unwrap();
        let opts = PyramidOptions::new(2).with_blur_levels(Some(0));
        let pyr = Pyramid::build(&img, opts).unwrap();
        assert_eq!(pyr.levels[1].to_vec::<f32>().unwrap(), vec![0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: PyramidOptions = serde_json::from_str(r#"{"levels": 5, "boundary": "zero order"}"#).unwrap();
        assert_eq!(opts.levels, 5);
        assert_eq!(opts.blur_levels, None);
        assert_eq!(opts.boundary, BoundaryCondition::ZeroOrderExtrapolate);
        assert!(Pyramid::build(&Image::new(&[2], 1, DataType::SFloat).unwrap(), PyramidOptions::new(0)).is_err());
    }
}
