//! Line primitives over raw strided sample buffers.
//!
//! These functions take type-erased pointers plus a [`DataType`] tag and
//! dispatch once per call to a monomorphized inner loop. Strides are in
//! samples of the buffer's own type and may be negative or zero. They are
//! `unsafe` because the caller vouches for every address the strides reach.

pub mod boundary;
mod copy;
mod expand;
mod fill;

pub use self::boundary::{
    boundary_array_use_parameter, extend_image, extend_region, read_pixel_with_boundary_condition,
    BoundaryCondition,
};
pub use self::copy::{copy_buffer, copy_buffer_real_component};
pub use self::expand::expand_buffer;
pub use self::fill::fill_buffer;

use crate::datatype::DataType;

/// Read-only strided line of samples.
#[derive(Clone, Copy, Debug)]
pub struct SampleLine {
    pub ptr: *const u8,
    pub data_type: DataType,
    pub stride: isize,
    pub tensor_stride: isize,
}

/// Writable strided line of samples.
#[derive(Clone, Copy, Debug)]
pub struct SampleLineMut {
    pub ptr: *mut u8,
    pub data_type: DataType,
    pub stride: isize,
    pub tensor_stride: isize,
}

impl SampleLine {
    pub fn new(ptr: *const u8, data_type: DataType, stride: isize, tensor_stride: isize) -> Self {
        Self {
            ptr,
            data_type,
            stride,
            tensor_stride,
        }
    }
}

impl SampleLineMut {
    pub fn new(ptr: *mut u8, data_type: DataType, stride: isize, tensor_stride: isize) -> Self {
        Self {
            ptr,
            data_type,
            stride,
            tensor_stride,
        }
    }

    pub fn as_const(self) -> SampleLine {
        SampleLine::new(self.ptr, self.data_type, self.stride, self.tensor_stride)
    }
}
