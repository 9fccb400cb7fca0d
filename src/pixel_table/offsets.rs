use super::PixelTable;
use crate::error::{check_length, Result};

/// A run projected onto image strides: the sample offset of its first pixel
/// relative to the neighbourhood origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRunOffset {
    pub offset: isize,
    pub length: usize,
}

/// A [`PixelTable`] bound to the strides of one image. Offsets are in
/// samples; adding one to a pixel's offset in that image addresses the
/// corresponding neighbour.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelTableOffsets {
    runs: Vec<PixelRunOffset>,
    weights: Option<Vec<f64>>,
    n_pixels: usize,
    proc_dim: usize,
    stride: isize,
}

impl PixelTableOffsets {
    pub(crate) fn new(table: &PixelTable, strides: &[isize]) -> Result<Self> {
        check_length(strides.len(), table.dimensionality())?;
        let runs = table
            .runs()
            .iter()
            .map(|run| PixelRunOffset {
                offset: run.coordinates.iter().zip(strides).map(|(&c, &s)| c * s).sum(),
                length: run.length,
            })
            .collect();
        Ok(PixelTableOffsets {
            runs,
            weights: table.weights().map(<[f64]>::to_vec),
            n_pixels: table.number_of_pixels(),
            proc_dim: table.processing_dimension(),
            stride: strides[table.processing_dimension()],
        })
    }

    pub fn runs(&self) -> &[PixelRunOffset] {
        &self.runs
    }

    pub fn number_of_pixels(&self) -> usize {
        self.n_pixels
    }

    pub fn processing_dimension(&self) -> usize {
        self.proc_dim
    }

    /// Image stride along the processing dimension.
    pub fn stride(&self) -> isize {
        self.stride
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Offset of every pixel, in run order.
    pub fn iter(&self) -> impl Iterator<Item = isize> + '_ {
        let stride = self.stride;
        self.runs
            .iter()
            .flat_map(move |run| (0..run.length as isize).map(move |k| run.offset + k * stride))
    }

    /// Offsets paired with weights; yields nothing when the table had none.
    pub fn iter_weighted(&self) -> impl Iterator<Item = (isize, f64)> + '_ {
        self.iter()
            .zip(self.weights.as_deref().unwrap_or(&[]).iter().copied())
    }

    pub fn offsets(&self) -> Vec<isize> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::PixelTableShape;
    use super::*;
    use crate::datatype::DataType;
    use crate::error::Error;
    use crate::image::Image;

    #[test]
    fn square_offsets_follow_image_strides() {
        let pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 3.0], 0).unwrap();
        let img = Image::new(&[10, 8], 1, DataType::UInt8).unwrap();
        let offsets = pt.prepare(&img).unwrap();
        assert_eq!(offsets.stride(), 1);
        assert_eq!(offsets.runs().len(), 3);
        assert_eq!(offsets.offsets(), vec![-11, -10, -9, -1, 0, 1, 9, 10, 11]);
        assert!(!offsets.has_weights());
        assert_eq!(offsets.iter_weighted().count(), 0);
    }

    #[test]
    fn runs_along_second_dimension_step_by_row_stride() {
        let mut pt = PixelTable::new(PixelTableShape::Rectangular, &[1.0, 3.0], 1).unwrap();
        pt.add_distance_to_origin_as_weights();
        let img = Image::new(&[10, 8], 1, DataType::UInt8).unwrap();
        let offsets = pt.prepare(&img).unwrap();
        assert_eq!(offsets.stride(), 10);
        let pairs: Vec<(isize, f64)> = offsets.iter_weighted().collect();
        assert_eq!(pairs, vec![(-10, 1.0), (0, 0.0), (10, 1.0)]);
    }

    #[test]
    fn dimensionality_must_match() {
        let pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 3.0], 0).unwrap();
        let img = Image::new(&[10], 1, DataType::UInt8).unwrap();
        assert!(matches!(pt.prepare(&img), Err(Error::ArrayParameterWrongLength { .. })));
    }
}
