//! Views sharing the data of an image, and header-only manipulations.

use super::Image;
use crate::error::{check_length, Error, Result};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Index range along one dimension. Negative `start`/`stop` count from the end
/// (`-1` is the last index). `start > stop` walks the dimension backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: isize,
    pub stop: isize,
    pub step: usize,
}

impl Default for Range {
    fn default() -> Self {
        Range::all()
    }
}

impl Range {
    /// The whole dimension.
    pub const fn all() -> Self {
        Range {
            start: 0,
            stop: -1,
            step: 1,
        }
    }

    /// A single index.
    pub const fn single(index: isize) -> Self {
        Range {
            start: index,
            stop: index,
            step: 1,
        }
    }

    pub const fn new(start: isize, stop: isize) -> Self {
        Range { start, stop, step: 1 }
    }

    pub const fn with_step(start: isize, stop: isize, step: usize) -> Self {
        Range { start, stop, step }
    }

    /// Resolves negative indices against `size` and validates the range.
    pub fn fix(&mut self, size: usize) -> Result<()> {
        if self.step == 0 {
            return Err(Error::parameter("range step must be non-zero"));
        }
        let resolve = |index: isize| -> Result<isize> {
            let resolved = if index < 0 { index + size as isize } else { index };
            if resolved < 0 || resolved >= size as isize {
                return Err(Error::IndexOutOfRange { index, size });
            }
            Ok(resolved)
        };
        self.start = resolve(self.start)?;
        self.stop = resolve(self.stop)?;
        // Make `stop` the last index actually visited.
        let span = (self.stop - self.start).unsigned_abs() / self.step * self.step;
        self.stop = if self.start > self.stop {
            self.start - span as isize
        } else {
            self.start + span as isize
        };
        Ok(())
    }

    /// Number of indices in a fixed range.
    pub fn size(&self) -> usize {
        (self.stop - self.start).unsigned_abs() / self.step + 1
    }

    /// First index of a fixed range.
    pub fn offset(&self) -> isize {
        self.start
    }

    /// Step including direction.
    pub fn signed_step(&self) -> isize {
        if self.start > self.stop {
            -(self.step as isize)
        } else {
            self.step as isize
        }
    }
}

/// Where a cropped (or padded) region sits relative to the larger image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropLocation {
    #[default]
    Center,
    MirrorCenter,
    TopLeft,
    BottomRight,
}

impl FromStr for CropLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "center" => Ok(CropLocation::Center),
            "mirror center" => Ok(CropLocation::MirrorCenter),
            "top left" => Ok(CropLocation::TopLeft),
            "bottom right" => Ok(CropLocation::BottomRight),
            _ => Err(Error::parameter(format!("invalid crop location \"{s}\""))),
        }
    }
}

impl CropLocation {
    /// Offset of a `small` extent inside a `big` one.
    fn offset(self, big: usize, small: usize) -> usize {
        match self {
            CropLocation::Center => big / 2 - small / 2,
            CropLocation::MirrorCenter => (big - 1) / 2 - (small - 1) / 2,
            CropLocation::TopLeft => 0,
            CropLocation::BottomRight => big - small,
        }
    }
}

/// Ranges selecting a region of sizes `window` inside an image of sizes
/// `sizes`, placed according to `location`.
pub fn crop_window(window: &[usize], sizes: &[usize], location: CropLocation) -> Result<Vec<Range>> {
    check_length(window.len(), sizes.len())?;
    window
        .iter()
        .zip(sizes)
        .map(|(&w, &size)| {
            if w == 0 || w > size {
                return Err(Error::SizesMismatch);
            }
            let start = location.offset(size, w) as isize;
            Ok(Range::new(start, start + w as isize - 1))
        })
        .collect()
}

impl Image {
    pub(crate) fn shift_origin(&mut self, offset: isize) {
        let bytes = offset * self.data_type.size_of() as isize;
        self.origin = (self.origin as isize + bytes) as usize;
    }

    /// Replaces the sizes without touching the strides. The caller guarantees
    /// the new sizes stay inside the data block.
    pub(crate) fn set_sizes_unsafe(&mut self, sizes: &[usize]) {
        self.sizes = sizes.to_vec();
    }

    /// Subregion view, one range per dimension.
    pub fn at(&self, ranges: &[Range]) -> Result<Image> {
        self.require_forged()?;
        if ranges.len() != self.dimensionality() {
            return Err(Error::DimensionalityMismatch {
                expected: self.dimensionality(),
                actual: ranges.len(),
            });
        }
        let mut out = self.clone();
        let mut offset = 0;
        for (ii, range) in ranges.iter().enumerate() {
            let mut range = *range;
            range.fix(self.sizes[ii])?;
            offset += range.offset() * self.strides[ii];
            out.sizes[ii] = range.size();
            out.strides[ii] = self.strides[ii] * range.signed_step();
        }
        out.shift_origin(offset);
        Ok(out)
    }

    /// View of a single pixel; keeps the dimensionality with all sizes 1.
    pub fn at_pixel(&self, coords: &[usize]) -> Result<Image> {
        let ranges: Vec<Range> = coords.iter().map(|&c| Range::single(c as isize)).collect();
        self.at(&ranges)
    }

    /// View of region of sizes `sizes`, placed according to `location`.
    pub fn crop(&self, sizes: &[usize], location: CropLocation) -> Result<Image> {
        let window = crop_window(sizes, &self.sizes, location)?;
        self.at(&window)
    }

    /// Scalar view of tensor element `index`.
    pub fn tensor_element(&self, index: usize) -> Result<Image> {
        self.require_forged()?;
        if index >= self.tensor_elements() {
            return Err(Error::IndexOutOfRange {
                index: index as isize,
                size: self.tensor_elements(),
            });
        }
        let mut out = self.clone();
        out.shift_origin(index as isize * self.tensor_stride);
        out.tensor = Tensor::scalar();
        out.color_space.clear();
        Ok(out)
    }

    fn complex_component(&self, imaginary: bool) -> Result<Image> {
        self.require_forged()?;
        if !self.data_type.is_complex() {
            return Err(Error::DataTypeNotSupported(self.data_type));
        }
        let mut out = self.clone();
        out.data_type = self.data_type.real();
        for s in out.strides.iter_mut() {
            *s *= 2;
        }
        out.tensor_stride *= 2;
        if imaginary {
            out.shift_origin(1);
        }
        Ok(out)
    }

    /// Real component of a complex image, as a view.
    pub fn real(&self) -> Result<Image> {
        self.complex_component(false)
    }

    /// Imaginary component of a complex image, as a view.
    pub fn imaginary(&self) -> Result<Image> {
        self.complex_component(true)
    }

    /// Reverses the dimensions flagged in `process`.
    pub fn mirror(&mut self, process: &[bool]) -> Result<()> {
        self.require_forged()?;
        check_length(process.len(), self.dimensionality())?;
        for ii in 0..process.len() {
            if process[ii] {
                let shift = (self.sizes[ii] as isize - 1) * self.strides[ii];
                self.shift_origin(shift);
                self.strides[ii] = -self.strides[ii];
            }
        }
        Ok(())
    }

    pub fn swap_dimensions(&mut self, a: usize, b: usize) -> Result<()> {
        let nd = self.dimensionality();
        for dim in [a, b] {
            if dim >= nd {
                return Err(Error::IndexOutOfRange {
                    index: dim as isize,
                    size: nd,
                });
            }
        }
        self.sizes.swap(a, b);
        if self.strides.len() == nd {
            self.strides.swap(a, b);
        }
        Ok(())
    }

    /// Inserts a singleton dimension at `dim`.
    pub fn add_singleton(&mut self, dim: usize) -> Result<()> {
        let nd = self.dimensionality();
        if dim > nd {
            return Err(Error::IndexOutOfRange {
                index: dim as isize,
                size: nd + 1,
            });
        }
        self.sizes.insert(dim, 1);
        if self.strides.len() == nd {
            self.strides.insert(dim, 0);
        }
        Ok(())
    }

    /// Appends singleton dimensions up to `n` dimensions.
    pub fn expand_dimensionality(&mut self, n: usize) {
        while self.dimensionality() < n {
            let nd = self.dimensionality();
            self.sizes.push(1);
            if self.strides.len() == nd {
                self.strides.push(0);
            }
        }
    }

    /// Turns a singleton dimension into a broadcast one of length `size`.
    pub fn expand_singleton_dimension(&mut self, dim: usize, size: usize) -> Result<()> {
        self.require_forged()?;
        if dim >= self.dimensionality() {
            return Err(Error::IndexOutOfRange {
                index: dim as isize,
                size: self.dimensionality(),
            });
        }
        if self.sizes[dim] != 1 {
            return Err(Error::parameter("dimension is not a singleton"));
        }
        self.sizes[dim] = size;
        self.strides[dim] = 0;
        Ok(())
    }

    /// Moves the tensor elements to a new last spatial dimension.
    pub fn tensor_to_spatial(&mut self) -> Result<()> {
        self.require_forged()?;
        self.sizes.push(self.tensor_elements());
        self.strides.push(self.tensor_stride);
        self.tensor = Tensor::scalar();
        self.tensor_stride = 1;
        self.color_space.clear();
        Ok(())
    }

    /// Changes the tensor shape keeping the number of elements.
    pub fn reshape_tensor(&mut self, tensor: Tensor) -> Result<()> {
        if tensor.elements() != self.tensor_elements() {
            return Err(Error::TensorElementsMismatch {
                expected: self.tensor_elements(),
                actual: tensor.elements(),
            });
        }
        self.tensor = tensor;
        Ok(())
    }
}
