//! Line cursors over one or several strided images.
//!
//! The iterators walk every dimension except an optional *processing
//! dimension* in lock-step, first dimension fastest, and expose the offset
//! (and raw address) of the current line start in each image. The caller
//! then walks the line itself using the processing-dimension stride.

use crate::error::{check_length, Error, Result};
use crate::image::Image;

/// Images smaller than this along a dimension are not worth processing along it
/// when a longer dimension exists.
const SMALL_IMAGE: usize = 63;

fn optimal_processing_dim_internal(sizes: &[usize], strides: &[isize]) -> usize {
    let mut proc_dim = 0;
    for ii in 1..strides.len() {
        if strides[ii] != 0 && strides[ii].abs() < strides[proc_dim].abs() {
            if sizes[ii] > SMALL_IMAGE || sizes[ii] > sizes[proc_dim] {
                proc_dim = ii;
            }
        } else if sizes[proc_dim] <= SMALL_IMAGE && sizes[ii] > sizes[proc_dim] {
            proc_dim = ii;
        }
    }
    proc_dim
}

/// The dimension with the smallest stride, unless it is short and a longer
/// dimension exists.
pub fn optimal_processing_dim(image: &Image) -> usize {
    optimal_processing_dim_internal(image.sizes(), image.strides())
}

/// Like [`optimal_processing_dim`], but never picks a dimension along which
/// the kernel has size 1.
pub fn optimal_processing_dim_for_kernel(image: &Image, kernel_sizes: &[usize]) -> Result<usize> {
    image.require_forged()?;
    check_length(kernel_sizes.len(), image.dimensionality())?;
    let sizes: Vec<usize> = image
        .sizes()
        .iter()
        .zip(kernel_sizes)
        .map(|(&size, &k)| if k == 1 { 1 } else { size })
        .collect();
    Ok(optimal_processing_dim_internal(&sizes, image.strides()))
}

/// Starting coordinates for `n_threads` workers that each take
/// `lines_per_thread` consecutive lines orthogonal to `proc_dim`.
pub fn split_image_evenly_for_processing(
    sizes: &[usize],
    n_threads: usize,
    lines_per_thread: usize,
    proc_dim: usize,
) -> Vec<Vec<usize>> {
    (0..n_threads)
        .map(|thread| {
            let mut line = thread * lines_per_thread;
            let mut coords = vec![0; sizes.len()];
            for (dim, &size) in sizes.iter().enumerate() {
                if dim == proc_dim {
                    continue;
                }
                coords[dim] = line % size;
                line /= size;
            }
            coords
        })
        .collect()
}

#[derive(Clone, Debug)]
struct Cursor {
    base: *mut u8,
    sample_size: isize,
    strides: Vec<isize>,
    offset: isize,
}

/// Walks several images together. The images must have the same
/// dimensionality and the same sizes along every dimension except the
/// processing dimension.
#[derive(Clone, Debug)]
pub struct GenericJointImageIterator {
    sizes: Vec<usize>,
    proc_dim: Option<usize>,
    coords: Vec<usize>,
    cursors: Vec<Cursor>,
    at_end: bool,
}

impl GenericJointImageIterator {
    pub fn new(images: &[&Image], proc_dim: Option<usize>) -> Result<Self> {
        let first = images
            .first()
            .ok_or_else(|| Error::parameter("joint iterator needs at least one image"))?;
        let nd = first.dimensionality();
        if let Some(dim) = proc_dim {
            if dim >= nd {
                return Err(Error::IndexOutOfRange {
                    index: dim as isize,
                    size: nd,
                });
            }
        }
        let mut cursors = Vec::with_capacity(images.len());
        for img in images {
            img.require_forged()?;
            if img.dimensionality() != nd {
                return Err(Error::DimensionalityMismatch {
                    expected: nd,
                    actual: img.dimensionality(),
                });
            }
            let mismatch = (0..nd).any(|dim| Some(dim) != proc_dim && img.size(dim) != first.size(dim));
            if mismatch {
                return Err(Error::SizesMismatch);
            }
            cursors.push(Cursor {
                base: img.pointer(0),
                sample_size: img.data_type().size_of() as isize,
                strides: img.strides().to_vec(),
                offset: 0,
            });
        }
        Ok(Self {
            sizes: first.sizes().to_vec(),
            proc_dim,
            coords: vec![0; nd],
            cursors,
            at_end: false,
        })
    }

    pub fn coordinates(&self) -> &[usize] {
        &self.coords
    }

    pub fn processing_dimension(&self) -> Option<usize> {
        self.proc_dim
    }

    /// Offset in samples of the current position in image `index`.
    pub fn offset(&self, index: usize) -> isize {
        self.cursors[index].offset
    }

    /// Address of the current position in image `index`.
    pub fn pointer(&self, index: usize) -> *mut u8 {
        let cursor = &self.cursors[index];
        cursor.base.wrapping_offset(cursor.offset * cursor.sample_size)
    }

    /// False once the iterator has moved past the last line.
    pub fn is_valid(&self) -> bool {
        !self.at_end
    }

    /// Jumps to `coords`; the processing-dimension coordinate is ignored and
    /// taken as 0.
    pub fn set_coordinates(&mut self, coords: &[usize]) -> Result<()> {
        check_length(coords.len(), self.sizes.len())?;
        for (dim, (&c, &size)) in coords.iter().zip(&self.sizes).enumerate() {
            if Some(dim) != self.proc_dim && c >= size {
                return Err(Error::CoordinateOutOfRange);
            }
        }
        self.coords.copy_from_slice(coords);
        if let Some(dim) = self.proc_dim {
            self.coords[dim] = 0;
        }
        for cursor in self.cursors.iter_mut() {
            cursor.offset = self
                .coords
                .iter()
                .zip(&cursor.strides)
                .map(|(&c, &s)| c as isize * s)
                .sum();
        }
        self.at_end = false;
        Ok(())
    }

    /// Moves to the next line (or pixel, without a processing dimension).
    /// Returns false when the last one has been passed; the iterator then
    /// wraps to the origin.
    pub fn next_line(&mut self) -> bool {
        for dim in 0..self.sizes.len() {
            if Some(dim) == self.proc_dim {
                continue;
            }
            self.coords[dim] += 1;
            if self.coords[dim] < self.sizes[dim] {
                for cursor in self.cursors.iter_mut() {
                    cursor.offset += cursor.strides[dim];
                }
                return true;
            }
            let back = (self.sizes[dim] - 1) as isize;
            for cursor in self.cursors.iter_mut() {
                cursor.offset -= back * cursor.strides[dim];
            }
            self.coords[dim] = 0;
        }
        self.at_end = true;
        false
    }
}

/// Single-image version of [`GenericJointImageIterator`].
#[derive(Clone, Debug)]
pub struct GenericImageIterator {
    inner: GenericJointImageIterator,
}

impl GenericImageIterator {
    pub fn new(image: &Image, proc_dim: Option<usize>) -> Result<Self> {
        Ok(Self {
            inner: GenericJointImageIterator::new(&[image], proc_dim)?,
        })
    }

    pub fn coordinates(&self) -> &[usize] {
        self.inner.coordinates()
    }

    pub fn offset(&self) -> isize {
        self.inner.offset(0)
    }

    pub fn pointer(&self) -> *mut u8 {
        self.inner.pointer(0)
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    pub fn set_coordinates(&mut self, coords: &[usize]) -> Result<()> {
        self.inner.set_coordinates(coords)
    }

    pub fn next_line(&mut self) -> bool {
        self.inner.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::image::Range;

    #[test]
    fn processing_dim_prefers_small_strides_unless_short() {
        assert_eq!(optimal_processing_dim_internal(&[100, 50], &[1, 100]), 0);
        assert_eq!(optimal_processing_dim_internal(&[100, 80], &[80, 1]), 1);
        assert_eq!(optimal_processing_dim_internal(&[100, 50], &[50, 1]), 0);
        // Short fastest dimension loses to a long one.
        assert_eq!(optimal_processing_dim_internal(&[3, 200], &[1, 3]), 1);
        assert_eq!(optimal_processing_dim_internal(&[], &[]), 0);
    }

    #[test]
    fn kernel_of_size_one_is_never_chosen() {
        let img = Image::new(&[100, 100], 1, DataType::UInt8).unwrap();
        assert_eq!(optimal_processing_dim_for_kernel(&img, &[1, 7]).unwrap(), 1);
        assert_eq!(optimal_processing_dim_for_kernel(&img, &[7, 7]).unwrap(), 0);
    }

    #[test]
    fn split_returns_line_starts() {
        let starts = split_image_evenly_for_processing(&[10, 4, 3], 3, 5, 0);
        assert_eq!(starts, vec![vec![0, 0, 0], vec![0, 1, 1], vec![0, 2, 2]]);
    }

    #[test]
    fn visits_every_line_once() {
        let img = Image::new(&[4, 3, 2], 1, DataType::SInt16).unwrap();
        let mut it = GenericImageIterator::new(&img, Some(1)).unwrap();
        let mut seen = Vec::new();
        loop {
            seen.push((it.coordinates().to_vec(), it.offset()));
            if !it.next_line() {
                break;
            }
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(seen[1], (vec![1, 0, 0], 1));
        assert_eq!(seen[4], (vec![0, 0, 1], 12));
        assert!(!it.is_valid());
        assert_eq!(it.offset(), 0);
    }

    #[test]
    fn joint_iterator_tracks_each_image_strides() {
        let a = Image::new(&[5, 3], 1, DataType::UInt8).unwrap();
        let b = Image::new(&[5, 3], 1, DataType::DFloat).unwrap();
        let b = b.at(&[Range::new(-1, 0), Range::all()]).unwrap();
        let mut it = GenericJointImageIterator::new(&[&a, &b], Some(1)).unwrap();
        assert!(it.next_line());
        assert_eq!((it.offset(0), it.offset(1)), (1, -1));
        it.set_coordinates(&[4, 2]).unwrap();
        assert_eq!(it.coordinates(), &[4, 0]);
        assert_eq!((it.offset(0), it.offset(1)), (4, -4));
        assert_eq!(it.pointer(1), b.pointer(-4));
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let a = Image::new(&[5, 3], 1, DataType::UInt8).unwrap();
        let b = Image::new(&[6, 3], 1, DataType::UInt8).unwrap();
        assert!(GenericJointImageIterator::new(&[&a, &b], Some(1)).is_err());
        assert!(GenericJointImageIterator::new(&[&a, &b], Some(0)).is_ok());
    }
}
