use crate::datatype::{DataType, Sample};
use crate::error::Result;
use std::ptr;

/// One image line as seen by a line filter: either a view straight into the
/// image or a scratch buffer owned by the worker.
///
/// Sample `i` of tensor element `t` lives at `ptr + i * stride + t * tensor_stride`
/// (in samples of `data_type`), for `-border <= i < length + border`.
#[derive(Debug)]
pub struct SeparableBuffer {
    pub(crate) ptr: *mut u8,
    pub(crate) data_type: DataType,
    pub(crate) length: usize,
    pub(crate) border: usize,
    pub(crate) stride: isize,
    pub(crate) tensor_stride: isize,
    pub(crate) tensor_length: usize,
}

impl SeparableBuffer {
    pub(crate) fn new(data_type: DataType, length: usize, border: usize, tensor_length: usize) -> Self {
        Self {
            ptr: ptr::null_mut(),
            data_type,
            length,
            border,
            stride: 0,
            tensor_stride: 0,
            tensor_length,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of samples, not counting the border.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Extra samples available on each side of the line.
    pub fn border(&self) -> usize {
        self.border
    }

    pub fn stride(&self) -> isize {
        self.stride
    }

    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    pub fn tensor_length(&self) -> usize {
        self.tensor_length
    }

    /// Address of sample 0, tensor element 0.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    fn address<T: Sample>(&self, index: isize, tensor: usize) -> *mut T {
        assert_eq!(
            T::DATA_TYPE,
            self.data_type,
            "buffer holds {} samples",
            self.data_type
        );
        let border = self.border as isize;
        assert!(
            index >= -border && index < self.length as isize + border,
            "sample {index} outside line of length {} with border {}",
            self.length,
            self.border
        );
        assert!(tensor < self.tensor_length, "tensor element {tensor} out of range");
        self.ptr
            .cast::<T>()
            .wrapping_offset(index * self.stride + tensor as isize * self.tensor_stride)
    }

    pub fn get<T: Sample>(&self, index: isize) -> T {
        self.get_tensor(index, 0)
    }

    pub fn get_tensor<T: Sample>(&self, index: isize, tensor: usize) -> T {
        let p = self.address::<T>(index, tensor);
        // The framework points the buffer at memory covering the checked range.
        unsafe { p.read() }
    }

    pub fn set<T: Sample>(&mut self, index: isize, value: T) {
        self.set_tensor(index, 0, value)
    }

    pub fn set_tensor<T: Sample>(&mut self, index: isize, tensor: usize, value: T) {
        let p = self.address::<T>(index, tensor);
        unsafe { p.write(value) }
    }

    /// Copies the first tensor element of every sample, border included.
    pub fn to_vec<T: Sample>(&self) -> Vec<T> {
        let border = self.border as isize;
        (-border..self.length as isize + border)
            .map(|i| self.get::<T>(i))
            .collect()
    }
}

/// Everything a line filter gets for one line.
#[derive(Debug)]
pub struct SeparableLineFilterParams<'a> {
    pub in_buffer: &'a SeparableBuffer,
    pub out_buffer: &'a mut SeparableBuffer,
    /// Dimension along which the line runs.
    pub dimension: usize,
    /// Pass number, `0..n_passes`.
    pub pass: usize,
    pub n_passes: usize,
    /// Coordinates of the first pixel of the line.
    pub position: &'a [usize],
    /// The tensor was turned into the last spatial dimension.
    pub tensor_to_spatial: bool,
    pub thread: usize,
}

/// Per-line callback driven by the separable framework.
pub trait SeparableLineFilter: Sync {
    /// Filters one line from `params.in_buffer` into `params.out_buffer`.
    fn filter(&self, params: &mut SeparableLineFilterParams<'_>) -> Result<()>;

    /// Called once with the number of workers before any line is filtered.
    fn set_number_of_threads(&mut self, _threads: usize) {}

    /// Rough cost of filtering one line, used to decide on multi-threading.
    fn number_of_operations(&self, line_length: usize, tensor_elements: usize, border: usize, _proc_dim: usize) -> usize {
        line_length * tensor_elements * 2 * (2 * border + 1)
    }
}
