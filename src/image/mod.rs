//! Strided N-dimensional image header.
//!
//! An [`Image`] is a lightweight descriptor: sizes, signed strides (in
//! samples), a tensor descriptor with its own stride, a data type and a byte
//! offset (`origin`) into a shared [`DataBlock`]. Cloning an `Image` yields a
//! new header over the same samples; [`Image::copy`] duplicates the data.
//!
//! Headers start out *raw* (no data). [`Image::forge`] allocates storage,
//! honouring custom strides when they are valid and compact, and an optional
//! [`ExternalInterface`] allocator.

pub mod alias;
pub mod copy;
pub mod data;
pub mod io;
pub mod views;

pub use self::data::{AlignedAllocInterface, DataBlock, ExternalAllocation, ExternalInterface};
pub use self::views::{CropLocation, Range};

use self::data::{
    compute_strides, data_block_size_and_start, number_of_pixels, simple_stride_size_and_start,
    strides_are_valid,
};
use crate::datatype::DataType;
use crate::error::{check_length, Error, Result};
use crate::tensor::Tensor;
use log::debug;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Image {
    data_type: DataType,
    sizes: Vec<usize>,
    strides: Vec<isize>,
    tensor: Tensor,
    tensor_stride: isize,
    color_space: String,
    data: Option<Arc<DataBlock>>,
    origin: usize,
    external_interface: Option<Arc<dyn ExternalInterface>>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("data_type", &self.data_type)
            .field("sizes", &self.sizes)
            .field("strides", &self.strides)
            .field("tensor", &self.tensor)
            .field("tensor_stride", &self.tensor_stride)
            .field("color_space", &self.color_space)
            .field("forged", &self.is_forged())
            .field("origin", &self.origin)
            .finish()
    }
}

impl Image {
    /// Raw (unforged) header.
    pub fn new_raw(sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Result<Self> {
        Ok(Self {
            data_type,
            sizes: sizes.to_vec(),
            tensor: Tensor::vector(tensor_elements)?,
            ..Self::default()
        })
    }

    /// Forged image with normal strides, all samples zero.
    pub fn new(sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Result<Self> {
        let mut img = Self::new_raw(sizes, tensor_elements, data_type)?;
        img.forge()?;
        Ok(img)
    }

    // --- Header accessors ---------------------------------------------------

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn stride(&self, dim: usize) -> isize {
        self.strides[dim]
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn tensor_elements(&self) -> usize {
        self.tensor.elements()
    }

    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    pub fn tensor_sizes(&self) -> Vec<usize> {
        self.tensor.sizes()
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor.is_scalar()
    }

    pub fn number_of_pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn number_of_samples(&self) -> usize {
        self.number_of_pixels() * self.tensor_elements()
    }

    pub fn color_space(&self) -> &str {
        &self.color_space
    }

    pub fn set_color_space(&mut self, color_space: impl Into<String>) {
        self.color_space = color_space.into();
    }

    pub fn is_forged(&self) -> bool {
        self.data.is_some()
    }

    /// More than one header refers to the data block.
    pub fn is_shared(&self) -> bool {
        self.data
            .as_ref()
            .map(|block| Arc::strong_count(block) > 1)
            .unwrap_or(false)
    }

    pub fn share_count(&self) -> usize {
        self.data.as_ref().map(Arc::strong_count).unwrap_or(0)
    }

    pub fn external_interface(&self) -> Option<&Arc<dyn ExternalInterface>> {
        self.external_interface.as_ref()
    }

    pub(crate) fn shares_data_block(&self, other: &Image) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn origin_bytes(&self) -> usize {
        self.origin
    }

    // --- Raw header setters -------------------------------------------------

    fn require_raw(&self) -> Result<()> {
        if self.is_forged() {
            return Err(Error::ImageNotRaw);
        }
        Ok(())
    }

    pub(crate) fn require_forged(&self) -> Result<()> {
        if !self.is_forged() {
            return Err(Error::ImageNotForged);
        }
        Ok(())
    }

    /// Sets new sizes and clears any custom strides.
    pub fn set_sizes(&mut self, sizes: &[usize]) -> Result<()> {
        self.require_raw()?;
        self.sizes = sizes.to_vec();
        self.strides.clear();
        Ok(())
    }

    /// Custom strides to be used by the next [`forge`](Self::forge).
    pub fn set_strides(&mut self, strides: &[isize]) -> Result<()> {
        self.require_raw()?;
        self.strides = strides.to_vec();
        Ok(())
    }

    pub fn set_tensor_stride(&mut self, tensor_stride: isize) -> Result<()> {
        self.require_raw()?;
        self.tensor_stride = tensor_stride;
        Ok(())
    }

    pub fn set_tensor_sizes(&mut self, sizes: &[usize]) -> Result<()> {
        self.require_raw()?;
        self.tensor.set_sizes(sizes)
    }

    pub fn set_data_type(&mut self, data_type: DataType) -> Result<()> {
        self.require_raw()?;
        self.data_type = data_type;
        Ok(())
    }

    pub fn set_external_interface(&mut self, interface: Option<Arc<dyn ExternalInterface>>) -> Result<()> {
        self.require_raw()?;
        self.external_interface = interface;
        Ok(())
    }

    // --- Lifecycle ----------------------------------------------------------

    /// Releases this header's reference to the data; sizes, strides and type
    /// are kept so the image can be forged again.
    pub fn strip(&mut self) {
        self.data = None;
        self.origin = 0;
    }

    /// Allocates the data block. No-op on a forged image.
    pub fn forge(&mut self) -> Result<()> {
        if self.is_forged() {
            return Ok(());
        }
        let pixels = number_of_pixels(&self.sizes)?;
        if pixels == 0 {
            return Err(Error::parameter(
                "cannot forge an image without pixels (sizes must be > 0)",
            ));
        }
        let samples = pixels
            .checked_mul(self.tensor_elements())
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or(Error::SizeExceedsLimit)?;
        let bytes = samples
            .checked_mul(self.data_type.size_of())
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or(Error::SizeExceedsLimit)?;

        if let Some(interface) = self.external_interface.clone() {
            let allocation = interface.allocate_data(
                self.data_type,
                &self.sizes,
                &self.strides,
                &self.tensor,
                self.tensor_stride,
            )?;
            if let Some(allocation) = allocation {
                check_length(allocation.strides.len(), self.sizes.len())?;
                self.strides = allocation.strides;
                self.tensor_stride = allocation.tensor_stride;
                self.origin = allocation.origin;
                self.data = Some(Arc::new(allocation.block));
                return Ok(());
            }
            debug!("external interface declined allocation, using default allocator");
        }

        let mut start = 0;
        let keep_strides = self.strides.len() == self.sizes.len()
            && self.has_valid_strides()
            && {
                let (size, s) = self.data_block_size_and_start();
                start = s;
                size == samples
            };
        if !keep_strides {
            if !self.strides.is_empty() {
                debug!("custom strides {:?} are not usable, setting normal strides", self.strides);
            }
            self.set_normal_strides();
            start = 0;
        }
        let block = DataBlock::zeroed(bytes)?;
        self.origin = (-start) as usize * self.data_type.size_of();
        self.data = Some(Arc::new(block));
        Ok(())
    }

    /// Makes the image forged with the given properties, reusing the current
    /// data block when possible.
    pub fn reforge(&mut self, sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Result<()> {
        if self.is_forged() {
            if self.sizes == sizes
                && self.tensor_elements() == tensor_elements
                && self.data_type == data_type
                && !self.is_singleton_expanded()
            {
                return Ok(());
            }
            let new_bytes = number_of_pixels(sizes)?
                .checked_mul(tensor_elements)
                .and_then(|n| n.checked_mul(data_type.size_of()))
                .ok_or(Error::SizeExceedsLimit)?;
            if !self.is_shared()
                && self.external_interface.is_none()
                && self.has_contiguous_data()
                && self.number_of_samples() * self.data_type.size_of() == new_bytes
            {
                let (_, start) = self.data_block_size_and_start();
                let block_start = self.origin as isize + start * self.data_type.size_of() as isize;
                self.sizes = sizes.to_vec();
                self.tensor = Tensor::vector(tensor_elements)?;
                self.data_type = data_type;
                self.set_normal_strides();
                self.origin = block_start as usize;
                return Ok(());
            }
            self.strip();
        }
        self.sizes = sizes.to_vec();
        self.strides.clear();
        self.tensor = Tensor::vector(tensor_elements)?;
        self.data_type = data_type;
        self.forge()
    }

    /// Same as [`reforge`](Self::reforge) with the properties of `other`; the
    /// tensor shape and color space are copied too.
    pub fn reforge_like(&mut self, other: &Image) -> Result<()> {
        self.reforge(&other.sizes, other.tensor_elements(), other.data_type)?;
        self.tensor = other.tensor;
        self.color_space = other.color_space.clone();
        Ok(())
    }

    fn set_normal_strides(&mut self) {
        self.tensor_stride = 1;
        self.strides = compute_strides(&self.sizes, self.tensor_elements());
    }

    // --- Stride queries -----------------------------------------------------

    pub fn has_normal_strides(&self) -> bool {
        if self.tensor_elements() > 1 && self.tensor_stride != 1 {
            return false;
        }
        self.strides == compute_strides(&self.sizes, self.tensor_elements())
    }

    /// No two pixels (or tensor elements) share an address.
    pub fn has_valid_strides(&self) -> bool {
        if self.strides.len() != self.sizes.len() {
            return false;
        }
        let mut strides = self.strides.clone();
        let mut sizes = self.sizes.clone();
        if self.tensor_elements() > 1 {
            strides.push(self.tensor_stride);
            sizes.push(self.tensor_elements());
        }
        strides_are_valid(&strides, &sizes)
    }

    /// Samples fill their data block without gaps.
    pub fn has_contiguous_data(&self) -> bool {
        self.is_forged()
            && self.has_valid_strides()
            && self.data_block_size_and_start().0 == self.number_of_samples()
    }

    pub fn is_singleton_expanded(&self) -> bool {
        if self.tensor_elements() > 1 && self.tensor_stride == 0 {
            return true;
        }
        self.strides
            .iter()
            .zip(&self.sizes)
            .any(|(&stride, &size)| stride == 0 && size > 1)
    }

    pub fn has_singleton_dimension(&self) -> bool {
        self.sizes.iter().any(|&size| size == 1)
    }

    /// Single stride that visits every pixel (ignoring the tensor dimension),
    /// together with the offset of the lowest-addressed pixel.
    pub fn simple_stride_and_origin(&self) -> Option<(isize, isize)> {
        let (stride, _, start) = simple_stride_size_and_start(&self.strides, &self.sizes);
        (stride != 0).then_some((stride, start))
    }

    /// Number of samples spanned, including the tensor dimension, and the
    /// offset of the lowest-addressed one relative to the origin.
    pub fn data_block_size_and_start(&self) -> (usize, isize) {
        let mut strides = self.strides.clone();
        let mut sizes = self.sizes.clone();
        strides.push(self.tensor_stride);
        sizes.push(self.tensor_elements());
        data_block_size_and_start(&strides, &sizes)
    }

    /// Both images walk their non-singleton dimensions in the same memory order.
    pub fn has_same_dimension_order(&self, other: &Image) -> bool {
        let non_singleton = |img: &Image| -> Vec<isize> {
            img.strides
                .iter()
                .zip(&img.sizes)
                .filter(|(_, &size)| size > 1)
                .map(|(&stride, _)| stride)
                .collect()
        };
        let s1 = non_singleton(self);
        let s2 = non_singleton(other);
        if s1.len() != s2.len() {
            return false;
        }
        if s1
            .iter()
            .zip(&s2)
            .any(|(&a, &b)| (a != 0 || b != 0) && a.signum() * b.signum() <= 0)
        {
            return false;
        }
        let mut pairs: Vec<(isize, isize)> = s1.iter().map(|s| s.abs()).zip(s2).collect();
        pairs.sort_by_key(|&(a, _)| a);
        pairs.windows(2).all(|w| w[1].1.abs() >= w[0].1.abs())
    }

    // --- Addressing ---------------------------------------------------------

    fn check_coordinates(&self, coords: &[usize]) -> Result<()> {
        if coords.len() != self.sizes.len() {
            return Err(Error::DimensionalityMismatch {
                expected: self.sizes.len(),
                actual: coords.len(),
            });
        }
        if coords.iter().zip(&self.sizes).any(|(&c, &size)| c >= size) {
            return Err(Error::CoordinateOutOfRange);
        }
        Ok(())
    }

    /// Offset in samples from the origin to the pixel at `coords`.
    pub fn offset(&self, coords: &[usize]) -> Result<isize> {
        self.check_coordinates(coords)?;
        Ok(coords
            .iter()
            .zip(&self.strides)
            .map(|(&c, &s)| c as isize * s)
            .sum())
    }

    /// Linear index of the pixel at `coords`, first dimension fastest.
    pub fn index(&self, coords: &[usize]) -> Result<usize> {
        self.check_coordinates(coords)?;
        let mut index = 0;
        for (&c, &size) in coords.iter().zip(&self.sizes).rev() {
            index = index * size + c;
        }
        Ok(index)
    }

    /// Inverse of [`offset`](Self::offset) for images with valid strides.
    pub fn offset_to_coordinates(&self, offset: isize) -> Result<Vec<usize>> {
        let nd = self.sizes.len();
        let mut shifted = offset;
        let mut order: Vec<usize> = Vec::with_capacity(nd);
        for ii in 0..nd {
            if self.strides[ii] < 0 {
                shifted -= (self.sizes[ii] as isize - 1) * self.strides[ii];
            }
            if self.strides[ii] != 0 {
                order.push(ii);
            }
        }
        if shifted < 0 {
            return Err(Error::CoordinateOutOfRange);
        }
        order.sort_by_key(|&ii| std::cmp::Reverse(self.strides[ii].unsigned_abs()));
        let mut rem = shifted as usize;
        let mut coords = vec![0; nd];
        for ii in order {
            let stride = self.strides[ii].unsigned_abs();
            let c = rem / stride;
            rem %= stride;
            if c >= self.sizes[ii] {
                return Err(Error::CoordinateOutOfRange);
            }
            coords[ii] = if self.strides[ii] < 0 {
                self.sizes[ii] - 1 - c
            } else {
                c
            };
        }
        Ok(coords)
    }

    pub fn index_to_coordinates(&self, index: usize) -> Result<Vec<usize>> {
        let n = self.number_of_pixels();
        if index >= n {
            return Err(Error::IndexOutOfRange {
                index: index as isize,
                size: n,
            });
        }
        let mut rem = index;
        Ok(self
            .sizes
            .iter()
            .map(|&size| {
                let c = rem % size;
                rem /= size;
                c
            })
            .collect())
    }

    /// Address of the sample `offset` samples away from the origin. Null for
    /// a raw image. Dereferencing is only valid for offsets inside the view.
    pub(crate) fn pointer(&self, offset: isize) -> *mut u8 {
        match &self.data {
            Some(block) => block
                .as_ptr()
                .wrapping_add(self.origin)
                .wrapping_offset(offset * self.data_type.size_of() as isize),
            None => std::ptr::null_mut(),
        }
    }
}
