//! Backing storage for forged images and the stride arithmetic shared by the
//! header operations.

use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use std::fmt;
use std::ptr::NonNull;

/// Reference-counted (through `Arc`) heap block holding the samples of one or
/// more image views. Zero-initialized, aligned to 8 bytes.
pub struct DataBlock {
    ptr: NonNull<u64>,
    words: usize,
    bytes: usize,
}

// The block is only ever accessed through raw pointers derived from views;
// concurrent writers are required to touch disjoint samples.
unsafe impl Send for DataBlock {}
unsafe impl Sync for DataBlock {}

impl DataBlock {
    /// Allocates `bytes` zeroed bytes. Fails instead of aborting when the
    /// allocator refuses the request.
    pub fn zeroed(bytes: usize) -> Result<Self> {
        let words = bytes.div_ceil(8).max(1);
        let mut storage: Vec<u64> = Vec::new();
        storage
            .try_reserve_exact(words)
            .map_err(|_| Error::AllocationFailed(bytes))?;
        storage.resize(words, 0);
        let boxed = storage.into_boxed_slice();
        let raw = Box::into_raw(boxed) as *mut u64;
        let ptr = NonNull::new(raw).ok_or(Error::AllocationFailed(bytes))?;
        Ok(Self { ptr, words, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr().cast::<u8>()
    }
}

impl Drop for DataBlock {
    fn drop(&mut self) {
        unsafe {
            let slice = std::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.words);
            drop(Box::from_raw(slice));
        }
    }
}

impl fmt::Debug for DataBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataBlock")
            .field("ptr", &self.ptr)
            .field("bytes", &self.bytes)
            .finish()
    }
}

/// Storage handed back by an [`ExternalInterface`].
#[derive(Debug)]
pub struct ExternalAllocation {
    pub block: DataBlock,
    /// Byte offset of the origin pixel inside `block`.
    pub origin: usize,
    pub strides: Vec<isize>,
    pub tensor_stride: isize,
}

/// Custom allocator consulted by `Image::forge`. Returning `Ok(None)` declines
/// the request and the default allocation is used instead.
pub trait ExternalInterface: Send + Sync + fmt::Debug {
    fn allocate_data(
        &self,
        data_type: DataType,
        sizes: &[usize],
        strides: &[isize],
        tensor: &Tensor,
        tensor_stride: isize,
    ) -> Result<Option<ExternalAllocation>>;
}

/// Allocates images whose scan lines (first dimension) all start on an
/// `alignment`-byte boundary, padding each line as needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignedAllocInterface {
    alignment: usize,
}

impl AlignedAllocInterface {
    pub fn new(alignment: usize) -> Result<Self> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(Error::parameter("alignment must be a power of two"));
        }
        Ok(Self { alignment })
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

impl ExternalInterface for AlignedAllocInterface {
    fn allocate_data(
        &self,
        data_type: DataType,
        sizes: &[usize],
        _strides: &[isize],
        tensor: &Tensor,
        _tensor_stride: isize,
    ) -> Result<Option<ExternalAllocation>> {
        let sample = data_type.size_of();
        if sizes.is_empty() || self.alignment % sample != 0 {
            return Ok(None);
        }
        let te = tensor.elements();
        let line_bytes = sizes[0]
            .checked_mul(te)
            .and_then(|n| n.checked_mul(sample))
            .ok_or(Error::SizeExceedsLimit)?;
        let padded_line = line_bytes.div_ceil(self.alignment) * self.alignment / sample;

        let mut strides = Vec::with_capacity(sizes.len());
        strides.push(te as isize);
        let mut step = padded_line;
        for &size in &sizes[1..] {
            strides.push(step as isize);
            step = step.checked_mul(size).ok_or(Error::SizeExceedsLimit)?;
        }
        let bytes = step
            .checked_mul(sample)
            .and_then(|n| n.checked_add(self.alignment))
            .ok_or(Error::SizeExceedsLimit)?;
        let block = DataBlock::zeroed(bytes)?;
        let address = block.as_ptr() as usize;
        let origin = (self.alignment - address % self.alignment) % self.alignment;
        Ok(Some(ExternalAllocation {
            block,
            origin,
            strides,
            tensor_stride: 1,
        }))
    }
}

/// Product of `sizes`, failing on overflow of the signed offset range.
pub(crate) fn number_of_pixels(sizes: &[usize]) -> Result<usize> {
    let mut n: usize = 1;
    for &size in sizes {
        n = n.checked_mul(size).ok_or(Error::SizeExceedsLimit)?;
        if n > isize::MAX as usize {
            return Err(Error::SizeExceedsLimit);
        }
    }
    Ok(n)
}

/// Normal strides: the first dimension steps over `first` elements (the
/// tensor elements of one pixel).
pub(crate) fn compute_strides(sizes: &[usize], first: usize) -> Vec<isize> {
    let mut step = first;
    sizes
        .iter()
        .map(|&size| {
            let s = step as isize;
            step *= size;
            s
        })
        .collect()
}

/// Number of elements spanned by `strides`/`sizes` and the (non-positive)
/// offset of the lowest one.
pub(crate) fn data_block_size_and_start(strides: &[isize], sizes: &[usize]) -> (usize, isize) {
    let mut min = 0isize;
    let mut max = 0isize;
    for (&stride, &size) in strides.iter().zip(sizes) {
        let p = (size as isize - 1) * stride;
        if p < 0 {
            min += p;
        } else {
            max += p;
        }
    }
    ((max - min + 1) as usize, min)
}

/// Single stride visiting every pixel exactly once, if one exists.
/// Returns `(stride, block_size, start)`; `stride` is 0 when there is none.
pub(crate) fn simple_stride_size_and_start(strides: &[isize], sizes: &[usize]) -> (isize, usize, isize) {
    if strides.is_empty() {
        return (1, 1, 0);
    }
    let sstride = strides
        .iter()
        .zip(sizes)
        .filter(|(_, &size)| size > 1)
        .map(|(&stride, _)| stride.abs())
        .min()
        .unwrap_or(1);
    let (size, start) = data_block_size_and_start(strides, sizes);
    let pixels: usize = sizes.iter().product();
    if size != (pixels - 1) * sstride as usize + 1 {
        return (0, size, start);
    }
    (sstride, size, start)
}

/// No two index tuples address the same element. Stride-0 dimensions of size
/// larger than one make strides invalid.
pub(crate) fn strides_are_valid(strides: &[isize], sizes: &[usize]) -> bool {
    if strides.len() != sizes.len() {
        return false;
    }
    let mut pairs: Vec<(usize, usize)> = strides
        .iter()
        .zip(sizes)
        .filter(|(_, &size)| size > 1)
        .map(|(&stride, &size)| (stride.unsigned_abs(), size))
        .collect();
    pairs.sort_by_key(|&(stride, _)| stride);
    if let Some(&(first, _)) = pairs.first() {
        if first == 0 {
            return false;
        }
    }
    pairs
        .windows(2)
        .all(|w| w[1].0 > w[0].0 * (w[0].1 - 1))
}

/// Coordinates along `strides` (positive, ascending) of a non-negative offset.
pub(crate) fn offset_to_coordinates(mut offset: usize, strides: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; strides.len()];
    for ii in (0..strides.len()).rev() {
        if strides[ii] == 0 {
            continue;
        }
        coords[ii] = offset / strides[ii];
        offset %= strides[ii];
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_strides_start_at_tensor_elements() {
        assert_eq!(compute_strides(&[5, 8, 7], 3), vec![3, 15, 120]);
        assert_eq!(compute_strides(&[], 1), Vec::<isize>::new());
    }

    #[test]
    fn block_size_accounts_for_negative_strides() {
        assert_eq!(data_block_size_and_start(&[1, -5], &[5, 4]), (20, -15));
        assert_eq!(data_block_size_and_start(&[2], &[3]), (5, 0));
    }

    #[test]
    fn simple_stride_detection() {
        assert_eq!(simple_stride_size_and_start(&[1, 5], &[5, 4]), (1, 20, 0));
        assert_eq!(simple_stride_size_and_start(&[-2, 10], &[5, 3]), (2, 29, -8));
        assert_eq!(simple_stride_size_and_start(&[1, 6], &[5, 4]).0, 0);
        assert_eq!(simple_stride_size_and_start(&[], &[]), (1, 1, 0));
    }

    #[test]
    fn stride_validity() {
        assert!(strides_are_valid(&[3, 15, 120], &[5, 8, 7]));
        assert!(strides_are_valid(&[40, 1], &[2, 40]));
        assert!(!strides_are_valid(&[1, 4], &[5, 3]));
        assert!(!strides_are_valid(&[0, 1], &[3, 4]));
        assert!(strides_are_valid(&[0, 1], &[1, 4]));
    }

    #[test]
    fn aligned_interface_pads_lines() {
        let iface = AlignedAllocInterface::new(32).unwrap();
        let alloc = iface
            .allocate_data(DataType::UInt8, &[10, 3], &[], &Tensor::scalar(), 1)
            .unwrap()
            .expect("interface accepts 8-bit data");
        assert_eq!(alloc.strides, vec![1, 32]);
        assert_eq!((alloc.block.as_ptr() as usize + alloc.origin) % 32, 0);
        assert!(AlignedAllocInterface::new(24).is_err());
    }
}
