//! Dimension-by-dimension line processing.
//!
//! Design
//! - Each pass walks all lines along one dimension. A line is copied into a
//!   scratch buffer of the buffer type when the image type differs, a border
//!   is needed, a tensor look-up table applies, or input and output share
//!   memory; otherwise the filter reads and writes the image directly.
//! - The first pass reads the input, the last writes the output. Passes in
//!   between go through an intermediate image of the buffer type when the
//!   output type differs from it or a later pass shrinks a dimension;
//!   otherwise they work in place in the output.
//! - Lines of a pass are split into contiguous chunks, one per worker. Each
//!   worker owns its scratch buffers. Passes run one after the other.

use super::buffer::{SeparableBuffer, SeparableLineFilter, SeparableLineFilterParams};
use super::options::{SeparableOption, SeparableOptions};
use super::threads::{number_of_threads, threading_threshold};
use crate::buffer::{
    boundary_array_use_parameter, copy_buffer, copy_buffer_real_component, expand_buffer,
    BoundaryCondition, SampleLine, SampleLineMut,
};
use crate::datatype::DataType;
use crate::error::{array_use_parameter, check_length, Error, Result};
use crate::image::copy::copy_samples;
use crate::image::Image;
use crate::iterators::{split_image_evenly_for_processing, GenericJointImageIterator};
use crate::tensor::Tensor;
use log::{debug, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scratch storage of one worker, reused across passes.
#[derive(Default)]
struct Scratch {
    input: Vec<u64>,
    output: Vec<u64>,
}

/// Points `buffer` at `storage`, grown to hold the line plus its borders, and
/// gives it a dense interleaved layout.
fn attach_scratch(buffer: &mut SeparableBuffer, storage: &mut Vec<u64>) {
    let dts = buffer.data_type.size_of();
    let tl = buffer.tensor_length;
    let bytes = (buffer.length + 2 * buffer.border) * dts * tl;
    let words = bytes.div_ceil(8);
    if storage.len() < words {
        storage.resize(words, 0);
    }
    buffer.stride = tl as isize;
    buffer.tensor_stride = 1;
    buffer.ptr = storage
        .as_mut_ptr()
        .cast::<u8>()
        .wrapping_add(buffer.border * dts * tl);
}

/// Everything the workers of one pass share.
struct LinePass<'a> {
    in_image: &'a Image,
    out_image: &'a Image,
    in_buffer_type: DataType,
    out_buffer_type: DataType,
    proc_dim: usize,
    pass: usize,
    n_passes: usize,
    in_border: usize,
    out_border: usize,
    boundary_condition: BoundaryCondition,
    look_up_table: &'a [isize],
    tensor_to_spatial: bool,
    in_use_buffer: bool,
    out_use_buffer: bool,
    use_real_component: bool,
    lines_per_thread: usize,
}

impl<'a> LinePass<'a> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        in_image: &'a Image,
        out_image: &'a Image,
        in_buffer_type: DataType,
        out_buffer_type: DataType,
        proc_dim: usize,
        border: usize,
        boundary_condition: BoundaryCondition,
        look_up_table: &'a [isize],
        options: SeparableOptions,
    ) -> Self {
        let out_border = if options.contains(SeparableOption::UseOutputBorder) {
            border
        } else {
            0
        };
        let mut in_use_buffer = in_image.data_type() != in_buffer_type
            || !look_up_table.is_empty()
            || border > 0
            || options.contains(SeparableOption::UseInputBuffer);
        let out_use_buffer = out_image.data_type() != out_buffer_type
            || out_border > 0
            || options.contains(SeparableOption::UseOutputBuffer);
        if !in_use_buffer && !out_use_buffer && in_image.pointer(0) == out_image.pointer(0) {
            in_use_buffer = !options.contains(SeparableOption::CanWorkInPlace);
        }
        let use_real_component = out_use_buffer
            && out_buffer_type.is_complex()
            && !out_image.data_type().is_complex()
            && options.contains(SeparableOption::UseRealComponentOfOutput);
        Self {
            in_image,
            out_image,
            in_buffer_type,
            out_buffer_type,
            proc_dim,
            pass: 0,
            n_passes: 1,
            in_border: border,
            out_border,
            boundary_condition,
            look_up_table,
            tensor_to_spatial: false,
            in_use_buffer,
            out_use_buffer,
            use_real_component,
            lines_per_thread: 0,
        }
    }

    /// Splits the lines over at most `n_threads` workers and runs them.
    fn run(&mut self, filter: &dyn SeparableLineFilter, scratch: &mut [Scratch]) -> Result<()> {
        let n_threads = scratch.len().max(1);
        let n_lines = self.in_image.number_of_pixels() / self.in_image.size(self.proc_dim);
        self.lines_per_thread = n_lines.div_ceil(n_threads);
        let d_threads = n_lines.div_ceil(self.lines_per_thread).min(n_threads);
        let mut sizes = self.in_image.sizes().to_vec();
        sizes[self.proc_dim] = self.out_image.size(self.proc_dim);
        let starts = split_image_evenly_for_processing(&sizes, d_threads, self.lines_per_thread, self.proc_dim);
        trace!(
            "pass {}/{} along dim {}: {} lines, {} workers, buffers in={} out={}",
            self.pass + 1,
            self.n_passes,
            self.proc_dim,
            n_lines,
            d_threads,
            self.in_use_buffer,
            self.out_use_buffer
        );
        let this = &*self;

        #[cfg(feature = "parallel")]
        {
            scratch[..d_threads]
                .par_iter_mut()
                .zip(starts.par_iter())
                .enumerate()
                .map(|(thread, (storage, start))| this.process_lines(filter, storage, thread, start))
                .collect::<Result<Vec<()>>>()?;
        }
        #[cfg(not(feature = "parallel"))]
        {
            scratch[..d_threads]
                .iter_mut()
                .zip(starts.iter())
                .enumerate()
                .try_for_each(|(thread, (storage, start))| this.process_lines(filter, storage, thread, start))?;
        }
        Ok(())
    }

    fn process_lines(
        &self,
        filter: &dyn SeparableLineFilter,
        storage: &mut Scratch,
        thread: usize,
        start: &[usize],
    ) -> Result<()> {
        let (inp, out) = (self.in_image, self.out_image);
        let dim = self.proc_dim;
        let in_length = inp.size(dim);
        let out_length = out.size(dim);

        let in_tensor_length = if self.look_up_table.is_empty() {
            inp.tensor_elements()
        } else {
            self.look_up_table.len()
        };
        let mut in_buffer = SeparableBuffer::new(self.in_buffer_type, in_length, self.in_border, in_tensor_length);
        if self.in_use_buffer {
            attach_scratch(&mut in_buffer, &mut storage.input);
        } else {
            in_buffer.data_type = inp.data_type();
            in_buffer.tensor_length = inp.tensor_elements();
            in_buffer.stride = inp.stride(dim);
            in_buffer.tensor_stride = inp.tensor_stride();
        }
        let mut out_buffer =
            SeparableBuffer::new(self.out_buffer_type, out_length, self.out_border, out.tensor_elements());
        if self.out_use_buffer {
            attach_scratch(&mut out_buffer, &mut storage.output);
        } else {
            out_buffer.data_type = out.data_type();
            out_buffer.stride = out.stride(dim);
            out_buffer.tensor_stride = out.tensor_stride();
        }

        let mut it = GenericJointImageIterator::new(&[inp, out], Some(dim))?;
        it.set_coordinates(start)?;
        for _ in 0..self.lines_per_thread {
            if self.in_use_buffer {
                let src = SampleLine::new(it.pointer(0), inp.data_type(), inp.stride(dim), inp.tensor_stride());
                let dst = SampleLineMut::new(
                    in_buffer.ptr,
                    self.in_buffer_type,
                    in_buffer.stride,
                    in_buffer.tensor_stride,
                );
                // The image line lies inside `inp`; the scratch buffer was sized
                // for `in_length` samples plus the border on both sides.
                unsafe {
                    copy_buffer(src, dst, in_length, in_buffer.tensor_length, self.look_up_table);
                    if self.in_border > 0 {
                        expand_buffer(
                            dst,
                            in_length,
                            in_buffer.tensor_length,
                            self.in_border,
                            self.in_border,
                            self.boundary_condition,
                        );
                    }
                }
            } else {
                in_buffer.ptr = it.pointer(0);
            }
            if !self.out_use_buffer {
                out_buffer.ptr = it.pointer(1);
            }

            let mut params = SeparableLineFilterParams {
                in_buffer: &in_buffer,
                out_buffer: &mut out_buffer,
                dimension: dim,
                pass: self.pass,
                n_passes: self.n_passes,
                position: it.coordinates(),
                tensor_to_spatial: self.tensor_to_spatial,
                thread,
            };
            filter.filter(&mut params)?;

            if self.out_use_buffer {
                let src = SampleLine::new(
                    out_buffer.ptr,
                    self.out_buffer_type,
                    out_buffer.stride,
                    out_buffer.tensor_stride,
                );
                let dst = SampleLineMut::new(it.pointer(1), out.data_type(), out.stride(dim), out.tensor_stride());
                // Lines written by different workers are disjoint.
                unsafe {
                    if self.use_real_component {
                        copy_buffer_real_component(src, dst, out_length, out_buffer.tensor_length);
                    } else {
                        copy_buffer(src, dst, out_length, out_buffer.tensor_length, &[]);
                    }
                }
            }
            if !it.next_line() {
                break;
            }
        }
        Ok(())
    }
}

/// Output sizes: those of the forged `output` under `DontResizeOutput`,
/// otherwise the input sizes.
fn output_sizes(
    in_sizes: &[usize],
    output: &Image,
    is_processed: impl Fn(usize) -> bool,
    options: SeparableOptions,
) -> Result<Vec<usize>> {
    if !options.contains(SeparableOption::DontResizeOutput) {
        return Ok(in_sizes.to_vec());
    }
    let out_sizes = output.sizes().to_vec();
    if out_sizes.len() != in_sizes.len() {
        return Err(Error::DimensionalityMismatch {
            expected: in_sizes.len(),
            actual: out_sizes.len(),
        });
    }
    for ii in 0..in_sizes.len() {
        if !is_processed(ii) && in_sizes[ii] != out_sizes[ii] {
            return Err(Error::parameter(
                "output size must match input size for dimensions not being processed",
            ));
        }
    }
    Ok(out_sizes)
}

/// Shared set-up of both entry points: strips an overlapping output, folds
/// or expands the tensor, and reforges the output. Returns the working input
/// and output headers, the tensor look-up table and whether the tensor became
/// a spatial dimension.
fn prepare_images(
    input: &Image,
    output: &mut Image,
    out_sizes: &[usize],
    out_image_type: DataType,
    options: SeparableOptions,
) -> Result<(Image, Image, Vec<isize>, bool)> {
    let mut work_in = input.clone();
    let mut color_space = input.color_space().to_string();
    let mut look_up_table = Vec::new();
    let mut out_tensor = *input.tensor();
    let mut tensor_to_spatial = false;
    if options.contains(SeparableOption::AsScalarImage) {
        if !work_in.is_scalar() {
            work_in.tensor_to_spatial()?;
            tensor_to_spatial = true;
        }
    } else if options.contains(SeparableOption::ExpandTensorInBuffer) && !input.tensor().has_normal_order() {
        look_up_table = input.tensor().look_up_table();
        out_tensor = Tensor::matrix(input.tensor().rows(), input.tensor().columns())?;
        color_space.clear();
    }

    output.reforge(out_sizes, out_tensor.elements(), out_image_type)?;
    output.reshape_tensor(out_tensor)?;
    output.set_color_space(color_space);

    let mut work_out = output.clone();
    if tensor_to_spatial {
        work_out.tensor_to_spatial()?;
    }
    Ok((work_in, work_out, look_up_table, tensor_to_spatial))
}

/// Applies `line_filter` along every dimension flagged in `process` (all
/// dimensions when empty), one pass per dimension.
///
/// `border` and `boundary_conditions` are per-dimension parameters (a single
/// value applies to all dimensions). Lines are handed to the filter in
/// `buffer_type`; the output is reforged with type `out_image_type` and,
/// unless `DontResizeOutput` is given, the input sizes.
#[allow(clippy::too_many_arguments)]
pub fn separable(
    input: &Image,
    output: &mut Image,
    buffer_type: DataType,
    out_image_type: DataType,
    process: &[bool],
    border: &[usize],
    boundary_conditions: &[BoundaryCondition],
    line_filter: &mut dyn SeparableLineFilter,
    options: SeparableOptions,
) -> Result<()> {
    input.require_forged()?;
    let nd = input.dimensionality();
    let mut process = if process.is_empty() {
        vec![true; nd]
    } else {
        check_length(process.len(), nd)?;
        process.to_vec()
    };
    let mut border = array_use_parameter(border, nd, 0)?;
    let mut boundary_conditions = if border.iter().any(|&b| b > 0) {
        boundary_array_use_parameter(boundary_conditions, nd)?
    } else {
        vec![BoundaryCondition::default(); nd]
    };

    if output.is_overlapping_view(input) {
        output.strip();
    }
    let mut in_sizes = input.sizes().to_vec();
    let mut out_sizes = output_sizes(&in_sizes, output, |ii| process[ii], options)?;
    for ii in 0..nd {
        if in_sizes[ii] == 1 && out_sizes[ii] == 1 {
            process[ii] = false;
        }
    }

    let (work_in, work_out, mut look_up_table, tensor_to_spatial) =
        prepare_images(input, output, &out_sizes, out_image_type, options)?;
    if tensor_to_spatial {
        process.push(false);
        border.push(0);
        boundary_conditions.push(BoundaryCondition::default());
        in_sizes = work_in.sizes().to_vec();
        out_sizes = work_out.sizes().to_vec();
    }
    let nd = in_sizes.len();

    let mut order: Vec<usize> = (0..nd).filter(|&ii| process[ii]).collect();
    if order.is_empty() {
        debug!("separable: no dimensions to process, copying input");
        if !look_up_table.is_empty() {
            return copy_samples(&work_in, &work_out, &look_up_table);
        }
        let mut target = work_out;
        return target.copy_from(&work_in);
    }
    order.sort_by_key(|&ii| work_in.stride(ii).unsigned_abs());
    if options.contains(SeparableOption::DontResizeOutput) {
        let grow = |ii: usize| out_sizes[ii] as f64 / in_sizes[ii] as f64;
        order.sort_by(|&a, &b| grow(a).total_cmp(&grow(b)));
    }

    let mut use_intermediate = order.len() > 1 && work_out.data_type() != buffer_type;
    let mut interm_sizes = out_sizes.clone();
    for &kk in &order[1..] {
        if in_sizes[kk] > out_sizes[kk] {
            interm_sizes[kk] = in_sizes[kk];
            use_intermediate = true;
        }
    }
    let intermediate = if use_intermediate {
        Some(Image::new(&interm_sizes, work_out.tensor_elements(), buffer_type)?)
    } else {
        None
    };

    let mut n_threads = 1;
    if !options.contains(SeparableOption::NoMultiThreading) && number_of_threads() > 1 {
        let mut operations = 0usize;
        let mut max_lines = 0;
        let mut sizes = in_sizes.clone();
        for &dim in &order {
            sizes[dim] = out_sizes[dim];
            let line_length = sizes[dim];
            let n_lines = sizes.iter().product::<usize>() / line_length;
            max_lines = max_lines.max(n_lines);
            if n_lines > 1 {
                operations = operations.saturating_add(n_lines.saturating_mul(line_filter.number_of_operations(
                    line_length,
                    work_in.tensor_elements(),
                    border[dim],
                    dim,
                )));
            }
        }
        if operations >= threading_threshold() {
            n_threads = number_of_threads().min(max_lines).max(1);
        }
    }
    line_filter.set_number_of_threads(n_threads);
    debug!(
        "separable: order {:?}, intermediate {}, {} thread(s)",
        order, use_intermediate, n_threads
    );

    let filter: &dyn SeparableLineFilter = line_filter;
    let mut scratch: Vec<Scratch> = (0..n_threads).map(|_| Scratch::default()).collect();
    let mut previous: Option<Image> = None;
    for (rep, &dim) in order.iter().enumerate() {
        let in_image = previous.take().unwrap_or_else(|| work_in.clone());
        let mut sizes = in_image.sizes().to_vec();
        sizes[dim] = out_sizes[dim];
        let mut out_image = match &intermediate {
            Some(interm) if rep + 1 < order.len() => interm.clone(),
            _ => work_out.clone(),
        };
        out_image.set_sizes_unsafe(&sizes);

        let mut pass = LinePass::new(
            &in_image,
            &out_image,
            buffer_type,
            buffer_type,
            dim,
            border[dim],
            boundary_conditions[dim],
            &look_up_table,
            options,
        );
        pass.pass = rep;
        pass.n_passes = order.len();
        pass.tensor_to_spatial = tensor_to_spatial;
        pass.run(filter, &mut scratch)?;

        // Later passes see a dense full-matrix tensor.
        look_up_table.clear();
        previous = Some(out_image);
    }
    Ok(())
}

/// Applies `line_filter` along `proc_dim` only. Unlike [`separable`], the
/// input and output buffer types can differ. A processing dimension of size
/// 1 on both sides is rejected.
#[allow(clippy::too_many_arguments)]
pub fn one_dimensional_line_filter(
    input: &Image,
    output: &mut Image,
    in_buffer_type: DataType,
    out_buffer_type: DataType,
    out_image_type: DataType,
    proc_dim: usize,
    border: usize,
    boundary_condition: BoundaryCondition,
    line_filter: &mut dyn SeparableLineFilter,
    options: SeparableOptions,
) -> Result<()> {
    input.require_forged()?;
    let nd = input.dimensionality();
    if proc_dim >= nd {
        return Err(Error::IndexOutOfRange {
            index: proc_dim as isize,
            size: nd,
        });
    }
    if output.is_overlapping_view(input) {
        output.strip();
    }
    let out_sizes = output_sizes(input.sizes(), output, |ii| ii == proc_dim, options)?;
    if input.size(proc_dim) == 1 && out_sizes[proc_dim] == 1 {
        return Err(Error::geometry("filtering dimension must have a size larger than 1"));
    }

    let (work_in, work_out, look_up_table, tensor_to_spatial) =
        prepare_images(input, output, &out_sizes, out_image_type, options)?;

    let mut n_threads = 1;
    if !options.contains(SeparableOption::NoMultiThreading) && number_of_threads() > 1 {
        let line_length = work_out.size(proc_dim);
        let n_lines = work_in.number_of_pixels() / work_in.size(proc_dim);
        let operations = if n_lines > 1 {
            n_lines.saturating_mul(line_filter.number_of_operations(
                line_length,
                work_in.tensor_elements(),
                border,
                proc_dim,
            ))
        } else {
            0
        };
        if operations >= threading_threshold() {
            n_threads = number_of_threads().min(n_lines).max(1);
        }
    }
    line_filter.set_number_of_threads(n_threads);
    debug!("one_dimensional_line_filter: dim {proc_dim}, {n_threads} thread(s)");

    let filter: &dyn SeparableLineFilter = line_filter;
    let mut scratch: Vec<Scratch> = (0..n_threads).map(|_| Scratch::default()).collect();
    let mut pass = LinePass::new(
        &work_in,
        &work_out,
        in_buffer_type,
        out_buffer_type,
        proc_dim,
        border,
        boundary_condition,
        &look_up_table,
        options,
    );
    pass.tensor_to_spatial = tensor_to_spatial;
    pass.run(filter, &mut scratch)
}
