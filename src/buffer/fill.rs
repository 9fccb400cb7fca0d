use super::SampleLineMut;
use crate::datatype::{dispatch_type, Sample, Value};

/// Writes `value`, cast to the buffer type, to every tensor element of
/// `pixels` pixels. A zero stride writes a single pixel (or tensor element).
///
/// # Safety
/// Every sample addressed by `output` for the given counts must be valid for
/// writes and not concurrently accessed.
pub unsafe fn fill_buffer(output: SampleLineMut, pixels: usize, tensor_elements: usize, value: Value) {
    dispatch_type!(output.data_type, T => fill_typed::<T>(
        output.ptr.cast::<T>(),
        output.stride,
        output.tensor_stride,
        pixels,
        tensor_elements,
        T::from_value(value),
    ))
}

pub(super) unsafe fn fill_typed<T: Sample>(
    out: *mut T,
    stride: isize,
    tensor_stride: isize,
    pixels: usize,
    tensor_elements: usize,
    value: T,
) {
    let (pixels, stride) = if stride == 0 { (pixels.min(1), 1) } else { (pixels, stride) };
    let (tensor_elements, tensor_stride) = if tensor_stride == 0 {
        (tensor_elements.min(1), 1)
    } else {
        (tensor_elements, tensor_stride)
    };
    if stride == tensor_elements as isize && (tensor_elements == 1 || tensor_stride == 1) {
        std::slice::from_raw_parts_mut(out, pixels * tensor_elements).fill(value);
        return;
    }
    if tensor_elements == 1 {
        for ii in 0..pixels as isize {
            out.offset(ii * stride).write(value);
        }
        return;
    }
    for ii in 0..pixels as isize {
        let pixel = out.offset(ii * stride);
        for jj in 0..tensor_elements as isize {
            pixel.offset(jj * tensor_stride).write(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;

    #[test]
    fn fill_saturates_and_respects_strides() {
        let mut data = [7u8; 10];
        let line = SampleLineMut::new(data.as_mut_ptr(), DataType::UInt8, 3, 1);
        unsafe { fill_buffer(line, 3, 2, Value::Int(300)) };
        assert_eq!(data, [255, 255, 7, 255, 255, 7, 255, 255, 7, 7]);
    }

    #[test]
    fn fill_twice_equals_fill_once() {
        let mut once = [0.0f32; 6];
        let mut twice = [0.0f32; 6];
        unsafe {
            fill_buffer(SampleLineMut::new(once.as_mut_ptr().cast(), DataType::SFloat, 1, 1), 6, 1, Value::Float(-2.5));
            let line = SampleLineMut::new(twice.as_mut_ptr().cast(), DataType::SFloat, 1, 1);
            fill_buffer(line, 6, 1, Value::Float(-2.5));
            fill_buffer(line, 6, 1, Value::Float(-2.5));
        }
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_stride_writes_one_pixel() {
        let mut data = [0i16; 4];
        let line = SampleLineMut::new(data.as_mut_ptr().cast(), DataType::SInt16, 0, 1);
        unsafe { fill_buffer(line, 4, 1, Value::Int(-9)) };
        assert_eq!(data, [-9, 0, 0, 0]);
    }
}
