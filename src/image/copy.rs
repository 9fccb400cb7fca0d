//! Data operations on whole images, built on the buffer primitives.

use super::views::crop_window;
use super::{CropLocation, Image};
use crate::buffer::{copy_buffer, extend_image, fill_buffer, BoundaryCondition, SampleLine, SampleLineMut};
use crate::datatype::{DataType, Sample};
use crate::error::{check_length, Error, Result};
use crate::iterators::{optimal_processing_dim, GenericImageIterator, GenericJointImageIterator};
use crate::tensor::Tensor;
use log::debug;

/// Copies all samples of `src` to `dst`, line by line. Sizes must match; the
/// tensor elements must match unless a look-up table is given, in which case
/// `dst` must have one tensor element per table entry.
pub(crate) fn copy_samples(src: &Image, dst: &Image, look_up_table: &[isize]) -> Result<()> {
    src.require_forged()?;
    dst.require_forged()?;
    if src.sizes() != dst.sizes() {
        return Err(Error::SizesMismatch);
    }
    let te = if look_up_table.is_empty() {
        if src.tensor_elements() != dst.tensor_elements() {
            return Err(Error::TensorElementsMismatch {
                expected: dst.tensor_elements(),
                actual: src.tensor_elements(),
            });
        }
        src.tensor_elements()
    } else {
        check_length(look_up_table.len(), dst.tensor_elements())?;
        look_up_table.len()
    };

    if src.dimensionality() == 0 {
        // Both lines address exactly one pixel inside their forged images.
        unsafe {
            copy_buffer(
                SampleLine::new(src.pointer(0), src.data_type(), 1, src.tensor_stride()),
                SampleLineMut::new(dst.pointer(0), dst.data_type(), 1, dst.tensor_stride()),
                1,
                te,
                look_up_table,
            )
        };
        return Ok(());
    }

    let proc_dim = optimal_processing_dim(src);
    let length = src.size(proc_dim);
    let mut it = GenericJointImageIterator::new(&[src, dst], Some(proc_dim))?;
    loop {
        let input = SampleLine::new(it.pointer(0), src.data_type(), src.stride(proc_dim), src.tensor_stride());
        let output = SampleLineMut::new(it.pointer(1), dst.data_type(), dst.stride(proc_dim), dst.tensor_stride());
        // Both lines lie inside their forged images.
        unsafe { copy_buffer(input, output, length, te, look_up_table) };
        if !it.next_line() {
            break;
        }
    }
    Ok(())
}

impl Image {
    /// Copies the pixel values of `src` into this image. A raw image is
    /// forged like `src` first; a forged one must have the same sizes and
    /// number of tensor elements, and keeps its own data type.
    pub fn copy_from(&mut self, src: &Image) -> Result<()> {
        src.require_forged()?;
        if !self.is_forged() {
            self.reforge_like(src)?;
            self.copy_samples_from(src)
        } else if self.is_identical_view(src) {
            Ok(())
        } else if self.aliases(src) {
            debug!("copy_from: source overlaps destination, copying through a temporary");
            let tmp = src.copy()?;
            self.copy_samples_from(&tmp)
        } else {
            self.copy_samples_from(src)
        }
    }

    fn copy_samples_from(&self, src: &Image) -> Result<()> {
        copy_samples(src, self, &[])
    }

    /// Deep copy with normal strides.
    pub fn copy(&self) -> Result<Image> {
        self.require_forged()?;
        let mut out = Image::default();
        out.reforge_like(self)?;
        copy_samples(self, &out, &[])?;
        Ok(out)
    }

    /// Deep copy with samples cast (saturating) to `data_type`.
    pub fn convert(&self, data_type: DataType) -> Result<Image> {
        self.require_forged()?;
        let mut out = Image::new(self.sizes(), self.tensor_elements(), data_type)?;
        out.reshape_tensor(*self.tensor())?;
        out.set_color_space(self.color_space());
        copy_samples(self, &out, &[])?;
        Ok(out)
    }

    /// Sets every sample to `value`, cast with saturation to the image type.
    pub fn fill<T: Sample>(&mut self, value: T) -> Result<()> {
        self.require_forged()?;
        let value = value.to_value();
        let te = self.tensor_elements();
        if self.has_contiguous_data() {
            let (samples, start) = self.data_block_size_and_start();
            let line = SampleLineMut::new(self.pointer(start), self.data_type(), 1, 1);
            // The data block spans exactly `samples` samples from `start`.
            unsafe { fill_buffer(line, samples, 1, value) };
            return Ok(());
        }
        if self.dimensionality() == 0 {
            let line = SampleLineMut::new(self.pointer(0), self.data_type(), 1, self.tensor_stride());
            unsafe { fill_buffer(line, 1, te, value) };
            return Ok(());
        }
        let proc_dim = optimal_processing_dim(self);
        let mut it = GenericImageIterator::new(self, Some(proc_dim))?;
        loop {
            let line = SampleLineMut::new(it.pointer(), self.data_type(), self.stride(proc_dim), self.tensor_stride());
            // Each line lies inside the forged image.
            unsafe { fill_buffer(line, self.size(proc_dim), te, value) };
            if !it.next_line() {
                break;
            }
        }
        Ok(())
    }

    fn sample_offset(&self, coords: &[usize], tensor_index: usize) -> Result<isize> {
        self.require_forged()?;
        if tensor_index >= self.tensor_elements() {
            return Err(Error::IndexOutOfRange {
                index: tensor_index as isize,
                size: self.tensor_elements(),
            });
        }
        Ok(self.offset(coords)? + tensor_index as isize * self.tensor_stride())
    }

    /// Reads one sample, cast with saturation to `T`.
    pub fn get<T: Sample>(&self, coords: &[usize], tensor_index: usize) -> Result<T> {
        let offset = self.sample_offset(coords, tensor_index)?;
        let mut value = T::default();
        let out = SampleLineMut::new((&mut value as *mut T).cast(), T::DATA_TYPE, 1, 1);
        let input = SampleLine::new(self.pointer(offset), self.data_type(), 1, 1);
        // `offset` was validated against the image geometry.
        unsafe { copy_buffer(input, out, 1, 1, &[]) };
        Ok(value)
    }

    /// Writes one sample, cast with saturation to the image type.
    pub fn set<T: Sample>(&mut self, coords: &[usize], tensor_index: usize, value: T) -> Result<()> {
        let offset = self.sample_offset(coords, tensor_index)?;
        let line = SampleLineMut::new(self.pointer(offset), self.data_type(), 1, 1);
        unsafe { fill_buffer(line, 1, 1, value.to_value()) };
        Ok(())
    }

    /// All samples cast to `T`, pixels in linear-index order (first
    /// dimension fastest) with the tensor elements of a pixel adjacent.
    pub fn to_vec<T: Sample>(&self) -> Result<Vec<T>> {
        self.require_forged()?;
        let out = Image::new(self.sizes(), self.tensor_elements(), T::DATA_TYPE)?;
        copy_samples(self, &out, &[])?;
        let n = out.number_of_samples();
        let mut values = vec![T::default(); n];
        // `out` has normal strides: its `n` samples are contiguous from the origin.
        unsafe { std::ptr::copy_nonoverlapping(out.pointer(0).cast::<T>(), values.as_mut_ptr(), n) };
        Ok(values)
    }

    /// Forged image of type `T` holding `data`, laid out as produced by
    /// [`to_vec`](Self::to_vec).
    pub fn from_vec<T: Sample>(sizes: &[usize], tensor_elements: usize, data: Vec<T>) -> Result<Image> {
        let img = Image::new(sizes, tensor_elements, T::DATA_TYPE)?;
        check_length(data.len(), img.number_of_samples())?;
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), img.pointer(0).cast::<T>(), data.len()) };
        Ok(img)
    }

    /// New image of sizes `sizes`, zero everywhere except for a copy of this
    /// image placed according to `location`.
    pub fn pad(&self, sizes: &[usize], location: CropLocation) -> Result<Image> {
        self.require_forged()?;
        check_length(sizes.len(), self.dimensionality())?;
        let mut out = Image::new(sizes, self.tensor_elements(), self.data_type())?;
        out.reshape_tensor(*self.tensor())?;
        out.set_color_space(self.color_space());
        let window = crop_window(self.sizes(), sizes, location)?;
        copy_samples(self, &out.at(&window)?, &[])?;
        Ok(out)
    }

    /// New image grown by `border` samples on both sides of each dimension,
    /// with the new samples defined by `boundary_conditions`.
    pub fn extend(&self, border: &[usize], boundary_conditions: &[BoundaryCondition]) -> Result<Image> {
        let mut out = Image::default();
        extend_image(self, &mut out, border, boundary_conditions)?;
        Ok(out)
    }

    /// Copy with a full column-major matrix tensor, expanding diagonal,
    /// symmetric and triangular storage. The color space is cleared.
    pub fn expand_tensor(&self) -> Result<Image> {
        self.require_forged()?;
        let tensor = self.tensor();
        if tensor.has_normal_order() {
            return self.copy();
        }
        let (rows, cols) = (tensor.rows(), tensor.columns());
        let lut = tensor.look_up_table();
        let mut out = Image::new(self.sizes(), rows * cols, self.data_type())?;
        out.reshape_tensor(Tensor::matrix(rows, cols)?)?;
        copy_samples(self, &out, &lut)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Range;
    use crate::tensor::TensorShape;

    #[test]
    fn copy_is_deep_and_convert_saturates() {
        let img = Image::from_vec(&[2, 2], 1, vec![-5i16, 0, 200, 300]).unwrap();
        let copy = img.copy().unwrap();
        assert!(!copy.aliases(&img));
        assert_eq!(copy.to_vec::<i16>().unwrap(), vec![-5, 0, 200, 300]);
        let u8img = img.convert(DataType::UInt8).unwrap();
        assert_eq!(u8img.to_vec::<u8>().unwrap(), vec![0, 0, 200, 255]);
    }

    #[test]
    fn fill_covers_strided_views_only() {
        let mut img = Image::new(&[4, 3], 1, DataType::UInt16).unwrap();
        let mut view = img.at(&[Range::with_step(0, -1, 2), Range::all()]).unwrap();
        view.fill(7u8).unwrap();
        assert_eq!(img.to_vec::<u16>().unwrap(), vec![7, 0, 7, 0, 7, 0, 7, 0, 7, 0, 7, 0]);
        img.fill(-1.0f64).unwrap();
        assert!(img.to_vec::<u16>().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn get_and_set_single_samples() {
        let mut img = Image::new(&[3, 2], 2, DataType::SFloat).unwrap();
        img.set(&[2, 1], 1, 4.5f64).unwrap();
        assert_eq!(img.get::<f32>(&[2, 1], 1).unwrap(), 4.5);
        assert_eq!(img.get::<i32>(&[2, 1], 1).unwrap(), 4);
        assert_eq!(img.get::<f32>(&[2, 1], 0).unwrap(), 0.0);
        assert!(img.get::<f32>(&[3, 1], 0).is_err());
        assert!(img.get::<f32>(&[0, 0], 2).is_err());
    }

    #[test]
    fn copy_from_overlapping_view_goes_through_temporary() {
        let img = Image::from_vec(&[5], 1, vec![1u8, 2, 3, 4, 5]).unwrap();
        let src = img.at(&[Range::new(0, 3)]).unwrap();
        let mut dst = img.at(&[Range::new(1, 4)]).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(img.to_vec::<u8>().unwrap(), vec![1, 1, 2, 3, 4]);
    }

    #[test]
    fn copy_from_into_raw_image_forges_it() {
        let src = Image::from_vec(&[3], 1, vec![1.5f32, 2.5, 3.5]).unwrap();
        let mut dst = Image::default();
        dst.copy_from(&src).unwrap();
        assert!(dst.is_forged());
        assert_eq!(dst.data_type(), DataType::SFloat);
        assert_eq!(dst.to_vec::<f32>().unwrap(), vec![1.5, 2.5, 3.5]);
        let mut wrong = Image::new(&[4], 1, DataType::SFloat).unwrap();
        assert_eq!(wrong.copy_from(&src), Err(Error::SizesMismatch));
    }

    #[test]
    fn pad_places_data_in_zero_image() {
        let img = Image::from_vec(&[2, 1], 1, vec![8u8, 9]).unwrap();
        let padded = img.pad(&[4, 3], CropLocation::Center).unwrap();
        assert_eq!(padded.to_vec::<u8>().unwrap(), vec![0, 0, 0, 0, 0, 8, 9, 0, 0, 0, 0, 0]);
        assert!(img.pad(&[1, 1], CropLocation::Center).is_err());
    }

    #[test]
    fn expand_tensor_fills_implicit_zeros() {
        let mut img = Image::from_vec(&[1], 2, vec![3i32, 4]).unwrap();
        img.reshape_tensor(Tensor::with_shape(TensorShape::DiagonalMatrix, 2, 2).unwrap())
            .unwrap();
        img.set_color_space("RGB");
        let full = img.expand_tensor().unwrap();
        assert_eq!(full.tensor_elements(), 4);
        assert_eq!(full.tensor().shape(), TensorShape::ColMajorMatrix);
        assert_eq!(full.to_vec::<i32>().unwrap(), vec![3, 0, 0, 4]);
        assert_eq!(full.color_space(), "");
    }
}
