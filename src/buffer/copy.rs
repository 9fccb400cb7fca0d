use super::fill::fill_typed;
use super::{SampleLine, SampleLineMut};
use crate::datatype::{dispatch_type, Sample};

/// Copies `pixels` pixels of `tensor_elements` samples from `input` to
/// `output`, casting each sample with saturation.
///
/// A zero output stride writes one pixel; a zero output tensor stride writes
/// one tensor element. A zero input stride broadcasts the first input pixel.
/// When `look_up_table` is not empty it defines the output tensor elements
/// (`tensor_elements` is then ignored): output element `t` is read from input
/// element `look_up_table[t]`, or set to zero when that entry is negative.
///
/// # Safety
/// All samples reached through `input` must be valid for reads and all
/// samples reached through `output` valid for writes. Input and output may
/// only overlap when they describe identical samples of the same type.
pub unsafe fn copy_buffer(
    input: SampleLine,
    output: SampleLineMut,
    pixels: usize,
    tensor_elements: usize,
    look_up_table: &[isize],
) {
    dispatch_type!(input.data_type, I => dispatch_type!(output.data_type, O => {
        copy_typed::<I, O>(input, output, pixels, tensor_elements, look_up_table)
    }))
}

/// Writes the real component of a complex `input` to a real `output`.
///
/// # Safety
/// Same contract as [`copy_buffer`].
pub unsafe fn copy_buffer_real_component(
    input: SampleLine,
    output: SampleLineMut,
    pixels: usize,
    tensor_elements: usize,
) {
    debug_assert!(input.data_type.is_complex());
    let real = SampleLine::new(
        input.ptr,
        input.data_type.real(),
        input.stride * 2,
        input.tensor_stride * 2,
    );
    copy_buffer(real, output, pixels, tensor_elements, &[]);
}

unsafe fn copy_typed<I: Sample, O: Sample>(
    input: SampleLine,
    output: SampleLineMut,
    pixels: usize,
    tensor_elements: usize,
    look_up_table: &[isize],
) {
    let inp = input.ptr.cast::<I>();
    let out = output.ptr.cast::<O>();
    let (in_stride, in_tstride) = (input.stride, input.tensor_stride);
    let (pixels, out_stride) = if output.stride == 0 {
        (pixels.min(1), 1)
    } else {
        (pixels, output.stride)
    };
    let (tensor_elements, out_tstride, lut) = if output.tensor_stride == 0 {
        (tensor_elements.min(1), 1, &look_up_table[..look_up_table.len().min(1)])
    } else {
        (tensor_elements, output.tensor_stride, look_up_table)
    };

    if !lut.is_empty() {
        for ii in 0..pixels as isize {
            let src = inp.offset(ii * in_stride);
            let dst = out.offset(ii * out_stride);
            for (jj, &index) in lut.iter().enumerate() {
                let value = if index < 0 {
                    O::default()
                } else {
                    src.offset(index * in_tstride).read().cast::<O>()
                };
                dst.offset(jj as isize * out_tstride).write(value);
            }
        }
        return;
    }

    if in_stride == 0 {
        for jj in 0..tensor_elements as isize {
            let value = inp.offset(jj * in_tstride).read().cast::<O>();
            fill_typed(out.offset(jj * out_tstride), out_stride, 1, pixels, 1, value);
        }
        return;
    }

    let dense = |stride: isize, tstride: isize| {
        stride == tensor_elements as isize && (tensor_elements == 1 || tstride == 1)
    };
    if I::DATA_TYPE == O::DATA_TYPE && dense(in_stride, in_tstride) && dense(out_stride, out_tstride) {
        std::ptr::copy(inp.cast::<O>(), out, pixels * tensor_elements);
        return;
    }

    if tensor_elements == 1 {
        for ii in 0..pixels as isize {
            out.offset(ii * out_stride)
                .write(inp.offset(ii * in_stride).read().cast::<O>());
        }
        return;
    }

    if dense(in_stride, in_tstride) && dense(out_stride, out_tstride) {
        for ii in 0..(pixels * tensor_elements) as isize {
            out.offset(ii).write(inp.offset(ii).read().cast::<O>());
        }
        return;
    }

    for ii in 0..pixels as isize {
        let src = inp.offset(ii * in_stride);
        let dst = out.offset(ii * out_stride);
        for jj in 0..tensor_elements as isize {
            dst.offset(jj * out_tstride)
                .write(src.offset(jj * in_tstride).read().cast::<O>());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use num_complex::Complex32;

    fn line<T>(data: &[T], dt: DataType, stride: isize, tstride: isize) -> SampleLine {
        SampleLine::new(data.as_ptr().cast(), dt, stride, tstride)
    }

    fn line_mut<T>(data: &mut [T], dt: DataType, stride: isize, tstride: isize) -> SampleLineMut {
        SampleLineMut::new(data.as_mut_ptr().cast(), dt, stride, tstride)
    }

    #[test]
    fn casts_saturate_to_destination_range() {
        let src = [-1i32, 300, 42, 255];
        let mut dst = [0u8; 4];
        unsafe {
            copy_buffer(
                line(&src, DataType::SInt32, 1, 1),
                line_mut(&mut dst, DataType::UInt8, 1, 1),
                4,
                1,
                &[],
            )
        };
        assert_eq!(dst, [0, 255, 42, 255]);
    }

    #[test]
    fn round_trip_between_types_is_exact_for_small_integers() {
        let src = [0u16, 1, 17, 100, 127];
        let mut mid = [0.0f64; 5];
        let mut back = [0u16; 5];
        unsafe {
            copy_buffer(line(&src, DataType::UInt16, 1, 1), line_mut(&mut mid, DataType::DFloat, 1, 1), 5, 1, &[]);
            copy_buffer(line(&mid, DataType::DFloat, 1, 1), line_mut(&mut back, DataType::UInt16, 1, 1), 5, 1, &[]);
        }
        assert_eq!(src, back);
    }

    #[test]
    fn strided_tensor_copy() {
        // Input: 3 pixels, 2 tensor elements stored plane-wise (tensor stride 3).
        let src = [1i8, 2, 3, 10, 20, 30];
        let mut dst = [0i16; 6];
        unsafe {
            copy_buffer(
                line(&src, DataType::SInt8, 1, 3),
                line_mut(&mut dst, DataType::SInt16, 2, 1),
                3,
                2,
                &[],
            )
        };
        assert_eq!(dst, [1, 10, 2, 20, 3, 30]);
    }

    #[test]
    fn look_up_table_expands_diagonal_tensor() {
        let src = [5.0f32, 7.0];
        let mut dst = [9.0f32; 4];
        unsafe {
            copy_buffer(
                line(&src, DataType::SFloat, 2, 1),
                line_mut(&mut dst, DataType::SFloat, 4, 1),
                1,
                2,
                &[0, -1, -1, 1],
            )
        };
        assert_eq!(dst, [5.0, 0.0, 0.0, 7.0]);
    }

    #[test]
    fn zero_input_stride_broadcasts() {
        let src = [3u32, 4];
        let mut dst = [0u32; 6];
        unsafe {
            copy_buffer(
                line(&src, DataType::UInt32, 0, 1),
                line_mut(&mut dst, DataType::UInt32, 2, 1),
                3,
                2,
                &[],
            )
        };
        assert_eq!(dst, [3, 4, 3, 4, 3, 4]);
    }

    #[test]
    fn zero_output_stride_writes_single_pixel() {
        let src = [1u8, 2, 3];
        let mut dst = [0u8; 3];
        unsafe {
            copy_buffer(line(&src, DataType::UInt8, 1, 1), line_mut(&mut dst, DataType::UInt8, 0, 1), 3, 1, &[])
        };
        assert_eq!(dst, [1, 0, 0]);
    }

    #[test]
    fn real_component_of_complex_buffer() {
        let src = [Complex32::new(1.5, -2.0), Complex32::new(-3.0, 4.0)];
        let mut dst = [0.0f64; 2];
        unsafe {
            copy_buffer_real_component(
                line(&src, DataType::SComplex, 1, 1),
                line_mut(&mut dst, DataType::DFloat, 1, 1),
                2,
                1,
            )
        };
        assert_eq!(dst, [1.5, -3.0]);
    }
}
