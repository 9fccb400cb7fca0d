use crate::buffer::{copy_buffer, SampleLine, SampleLineMut};
use crate::error::{Error, Result};
use crate::framework::{separable, SeparableLineFilter, SeparableLineFilterParams, SeparableOption};
use crate::image::Image;
use log::debug;

/// Keeps every `factor`-th sample of a line, starting with the first.
/// Works on any sample type: lines are copied without conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubsampleFilter {
    factor: usize,
}

impl SubsampleFilter {
    pub fn new(factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(Error::parameter("subsampling factor must be at least 1"));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Output length for an input line of `length` samples.
    pub fn output_length(&self, length: usize) -> usize {
        length.div_ceil(self.factor)
    }
}

impl SeparableLineFilter for SubsampleFilter {
    fn filter(&self, params: &mut SeparableLineFilterParams<'_>) -> Result<()> {
        let input = params.in_buffer;
        let output = &mut *params.out_buffer;
        let needed = output.length().saturating_sub(1) * self.factor;
        if needed >= input.length() + input.border() {
            return Err(Error::SizesMismatch);
        }
        if input.tensor_length() != output.tensor_length() || input.data_type() != output.data_type() {
            return Err(Error::parameter("subsampling needs matching input and output buffers"));
        }
        let src = SampleLine::new(
            input.as_ptr(),
            input.data_type(),
            input.stride() * self.factor as isize,
            input.tensor_stride(),
        );
        let dst = SampleLineMut::new(output.as_ptr(), output.data_type(), output.stride(), output.tensor_stride());
        // Every source index `k * factor` for `k < length` lies inside the line.
        unsafe { copy_buffer(src, dst, output.length(), output.tensor_length(), &[]) };
        Ok(())
    }

    fn number_of_operations(&self, line_length: usize, tensor_elements: usize, _border: usize, _proc_dim: usize) -> usize {
        line_length * tensor_elements
    }
}

/// Decimates `input` by `factor` along every dimension: output pixel `x`
/// is input pixel `x * factor`, and each output size is
/// `ceil(size / factor)`. The sample type is kept.
pub fn downsample(input: &Image, output: &mut Image, factor: usize) -> Result<()> {
    input.require_forged()?;
    let mut filter = SubsampleFilter::new(factor)?;
    let out_sizes: Vec<usize> = input.sizes().iter().map(|&s| filter.output_length(s)).collect();
    if output.aliases(input) {
        output.strip();
    }
    output.reforge(&out_sizes, input.tensor_elements(), input.data_type())?;
    debug!("downsample by {factor}: {:?} -> {:?}", input.sizes(), out_sizes);
    separable(
        input,
        output,
        input.data_type(),
        input.data_type(),
        &[],
        &[],
        &[],
        &mut filter,
        SeparableOption::DontResizeOutput.into(),
    )
}
