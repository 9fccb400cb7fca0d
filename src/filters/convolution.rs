//! Separable convolution with 1-D taps.
//!
//! Taps are applied in correlation order: output sample `i` is
//! `sum_k taps[k] * input[i + k - taps.len() / 2]`. For the symmetric
//! kernels used here this equals convolution. Lines are processed in a
//! `DFloat` buffer with a border of `taps.len() / 2` samples filled according
//! to the boundary condition.

use crate::buffer::BoundaryCondition;
use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::framework::{separable, SeparableLineFilter, SeparableLineFilterParams, SeparableOptions};
use crate::image::Image;
use log::debug;

/// A source of 1-D filter taps, in left-to-right order.
pub trait SeparableFilter {
    fn taps(&self) -> &[f32];
}

/// Taps stored in a `static` slice.
#[derive(Clone, Copy, Debug)]
pub struct StaticSeparableFilter {
    taps: &'static [f32],
}

impl Default for StaticSeparableFilter {
    fn default() -> Self {
        GAUSSIAN_5TAP
    }
}

impl StaticSeparableFilter {
    pub const fn new(taps: &'static [f32]) -> Self {
        Self { taps }
    }
}

impl SeparableFilter for StaticSeparableFilter {
    #[inline]
    fn taps(&self) -> &[f32] {
        self.taps
    }
}

/// Normalised 5-tap Gaussian filter `[1, 4, 6, 4, 1] / 16`.
pub const GAUSSIAN_5TAP: StaticSeparableFilter =
    StaticSeparableFilter::new(&[0.0625, 0.25, 0.375, 0.25, 0.0625]);

/// Line filter convolving every line with one set of taps, or with a
/// different set per dimension.
#[derive(Clone, Debug)]
pub struct ConvolutionFilter {
    taps: Vec<Vec<f64>>,
}

impl ConvolutionFilter {
    /// Same taps along every dimension.
    pub fn new(filter: &impl SeparableFilter) -> Result<Self> {
        Self::per_dimension(vec![filter.taps().iter().map(|&t| f64::from(t)).collect()])
    }

    /// One set of taps per dimension; a single set applies to all.
    pub fn per_dimension(taps: Vec<Vec<f64>>) -> Result<Self> {
        if taps.is_empty() || taps.iter().any(Vec::is_empty) {
            return Err(Error::parameter("filter must provide at least one tap"));
        }
        if taps.iter().flatten().any(|t| !t.is_finite()) {
            return Err(Error::parameter("filter taps must be finite"));
        }
        Ok(Self { taps })
    }

    /// Taps used along `dim`.
    pub fn taps(&self, dim: usize) -> &[f64] {
        if self.taps.len() == 1 {
            &self.taps[0]
        } else {
            &self.taps[dim]
        }
    }

    /// Border needed along each of `n_dims` dimensions.
    pub fn border(&self, n_dims: usize) -> Result<Vec<usize>> {
        if self.taps.len() != 1 && self.taps.len() != n_dims {
            return Err(Error::ArrayParameterWrongLength {
                expected: n_dims,
                actual: self.taps.len(),
            });
        }
        Ok((0..n_dims).map(|dim| self.taps(dim).len() / 2).collect())
    }
}

impl SeparableLineFilter for ConvolutionFilter {
    fn filter(&self, params: &mut SeparableLineFilterParams<'_>) -> Result<()> {
        let taps = self.taps(params.dimension);
        let radius = (taps.len() / 2) as isize;
        let input = params.in_buffer;
        let output = &mut *params.out_buffer;
        for t in 0..output.tensor_length() {
            for i in 0..output.length() as isize {
                let acc: f64 = taps
                    .iter()
                    .enumerate()
                    .map(|(k, &tap)| tap * input.get_tensor::<f64>(i + k as isize - radius, t))
                    .sum();
                output.set_tensor(i, t, acc);
            }
        }
        Ok(())
    }

    fn number_of_operations(&self, line_length: usize, tensor_elements: usize, _border: usize, proc_dim: usize) -> usize {
        line_length * tensor_elements * 2 * self.taps(proc_dim).len()
    }
}

/// Convolves `input` with `filter` along every dimension flagged in
/// `process` (all when empty). The output type is the floating-point type
/// suggested for the input; complex input is not supported.
pub fn separable_convolution(
    input: &Image,
    output: &mut Image,
    filter: &ConvolutionFilter,
    boundary_conditions: &[BoundaryCondition],
    process: &[bool],
) -> Result<()> {
    input.require_forged()?;
    if input.data_type().is_complex() {
        return Err(Error::DataTypeNotSupported(input.data_type()));
    }
    let border = filter.border(input.dimensionality())?;
    let out_type = input.data_type().suggest_float();
    debug!(
        "separable_convolution: sizes {:?}, border {:?}, output {}",
        input.sizes(),
        border,
        out_type
    );
    let mut line_filter = filter.clone();
    separable(
        input,
        output,
        DataType::DFloat,
        out_type,
        process,
        &border,
        boundary_conditions,
        &mut line_filter,
        SeparableOptions::new(),
    )
}

/// Blurs along all dimensions with [`GAUSSIAN_5TAP`].
pub fn gaussian_blur(input: &Image, output: &mut Image, boundary_conditions: &[BoundaryCondition]) -> Result<()> {
    let filter = ConvolutionFilter::new(&GAUSSIAN_5TAP)?;
    separable_convolution(input, output, &filter, boundary_conditions, &[])
}
