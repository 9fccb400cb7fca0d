//! Run-length neighbourhood descriptors.
//!
//! A [`PixelTable`] lists the pixels of a neighbourhood as runs along one
//! processing dimension. Each run stores the coordinates of its first pixel
//! relative to the neighbourhood origin and its length. Runs never overlap.
//! Optional weights hold one value per pixel, in run order.
//!
//! Tables are built from a named shape (`rectangular`, `elliptic`, `diamond`,
//! `line`) with a per-dimension diameter, or from a binary mask image.
//! [`PixelTable::prepare`] projects a table onto the strides of one image.

pub mod offsets;

pub use self::offsets::{PixelRunOffset, PixelTableOffsets};

use crate::datatype::{Bin, DataType};
use crate::error::{check_length, Error, Result};
use crate::image::Image;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named neighbourhood shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelTableShape {
    /// Unit ball of the L-infinity norm.
    #[default]
    Rectangular,
    /// Unit ball of the L2 norm.
    Elliptic,
    /// Unit ball of the L1 norm.
    Diamond,
    /// Discrete straight line through the origin.
    Line,
}

impl PixelTableShape {
    pub const fn name(self) -> &'static str {
        match self {
            PixelTableShape::Rectangular => "rectangular",
            PixelTableShape::Elliptic => "elliptic",
            PixelTableShape::Diamond => "diamond",
            PixelTableShape::Line => "line",
        }
    }
}

impl fmt::Display for PixelTableShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelTableShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rectangular" => Ok(PixelTableShape::Rectangular),
            "elliptic" => Ok(PixelTableShape::Elliptic),
            "diamond" => Ok(PixelTableShape::Diamond),
            "line" => Ok(PixelTableShape::Line),
            other => Err(Error::geometry(format!("unknown neighbourhood shape '{other}'"))),
        }
    }
}

/// A run of pixels along the processing dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelRun {
    /// Coordinates of the first pixel, relative to the origin.
    pub coordinates: Vec<isize>,
    pub length: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelTable {
    runs: Vec<PixelRun>,
    weights: Option<Vec<f64>>,
    sizes: Vec<usize>,
    /// Position of the bounding box's first corner relative to the origin.
    origin: Vec<isize>,
    n_pixels: usize,
    proc_dim: usize,
}

/// Walks all coordinates in `[start, start + sizes)` for every dimension
/// except `skip`, lowest dimension fastest. Returns false after the last one.
fn next_line_coordinates(coords: &mut [isize], start: &[isize], sizes: &[usize], skip: usize) -> bool {
    for ii in 0..coords.len() {
        if ii == skip {
            continue;
        }
        coords[ii] += 1;
        if coords[ii] < start[ii] + sizes[ii] as isize {
            return true;
        }
        coords[ii] = start[ii];
    }
    false
}

fn linear_index(coords: &[usize], sizes: &[usize]) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for (&c, &s) in coords.iter().zip(sizes) {
        index += c * stride;
        stride *= s;
    }
    index
}

impl PixelTable {
    /// Table for the named `shape` with diameter `size` per dimension.
    ///
    /// - `rectangular`: sizes rounded down (at least 1).
    /// - `elliptic`, `diamond`: sizes truncated then made odd; the shape is
    ///   the ball of radius `size / 2` in the L2 or L1 norm.
    /// - `line`: a Bresenham line spanning `round(size)` pixels per dimension,
    ///   stepping once per pixel along the longest one; a negative size runs
    ///   the line backwards along that dimension.
    pub fn new(shape: PixelTableShape, size: &[f64], proc_dim: usize) -> Result<Self> {
        let nd = size.len();
        if nd == 0 {
            return Err(Error::geometry("neighbourhood needs at least one dimension"));
        }
        if proc_dim >= nd {
            return Err(Error::IndexOutOfRange {
                index: proc_dim as isize,
                size: nd,
            });
        }
        if size.iter().any(|s| !s.is_finite()) {
            return Err(Error::parameter("neighbourhood sizes must be finite"));
        }
        if shape != PixelTableShape::Line && size.iter().any(|&s| s <= 0.0) {
            return Err(Error::parameter("neighbourhood sizes must be positive"));
        }
        let table = match shape {
            PixelTableShape::Rectangular => Self::rectangular(size, proc_dim),
            PixelTableShape::Elliptic | PixelTableShape::Diamond => Self::ball(shape, size, proc_dim),
            PixelTableShape::Line => Self::line(size, proc_dim),
        };
        debug!(
            "pixel table {shape}: sizes {:?}, {} runs, {} pixels",
            table.sizes,
            table.runs.len(),
            table.n_pixels
        );
        Ok(table)
    }

    /// Same as [`new`](Self::new) with the shape given by name.
    pub fn from_shape_name(shape: &str, size: &[f64], proc_dim: usize) -> Result<Self> {
        Self::new(shape.parse()?, size, proc_dim)
    }

    fn rectangular(size: &[f64], proc_dim: usize) -> Self {
        let sizes: Vec<usize> = size.iter().map(|&s| (s.floor() as usize).max(1)).collect();
        let origin: Vec<isize> = sizes.iter().map(|&s| -((s / 2) as isize)).collect();
        let length = sizes[proc_dim];
        let mut runs = Vec::with_capacity(sizes.iter().product::<usize>() / length);
        let mut coords = origin.clone();
        loop {
            runs.push(PixelRun {
                coordinates: coords.clone(),
                length,
            });
            if !next_line_coordinates(&mut coords, &origin, &sizes, proc_dim) {
                break;
            }
        }
        let n_pixels = runs.len() * length;
        PixelTable {
            runs,
            weights: None,
            sizes,
            origin,
            n_pixels,
            proc_dim,
        }
    }

    fn ball(shape: PixelTableShape, size: &[f64], proc_dim: usize) -> Self {
        let sizes: Vec<usize> = size.iter().map(|&s| (s as usize / 2) * 2 + 1).collect();
        let origin: Vec<isize> = sizes.iter().map(|&s| -((s / 2) as isize)).collect();
        let radii: Vec<f64> = size.iter().map(|&s| s / 2.0).collect();
        let mut runs = Vec::new();
        let mut n_pixels = 0;
        let mut coords = origin.clone();
        loop {
            let others = coords
                .iter()
                .zip(&radii)
                .enumerate()
                .filter(|&(ii, _)| ii != proc_dim)
                .map(|(_, (&c, &r))| c as f64 / r);
            let half = match shape {
                PixelTableShape::Elliptic => {
                    let distance2: f64 = others.map(|t| t * t).sum();
                    (distance2 <= 1.0).then(|| (radii[proc_dim] * (1.0 - distance2).sqrt()).floor())
                }
                _ => {
                    let distance: f64 = others.map(f64::abs).sum();
                    (distance <= 1.0).then(|| (radii[proc_dim] * (1.0 - distance)).floor())
                }
            };
            if let Some(half) = half {
                let half = half as isize;
                let mut start = coords.clone();
                start[proc_dim] = -half;
                let length = (2 * half + 1) as usize;
                runs.push(PixelRun {
                    coordinates: start,
                    length,
                });
                n_pixels += length;
            }
            if !next_line_coordinates(&mut coords, &origin, &sizes, proc_dim) {
                break;
            }
        }
        PixelTable {
            runs,
            weights: None,
            sizes,
            origin,
            n_pixels,
            proc_dim,
        }
    }

    fn line(size: &[f64], proc_dim: usize) -> Self {
        let nd = size.len();
        let sizes: Vec<usize> = size.iter().map(|&s| (s.abs().round() as usize).max(1)).collect();
        let (step_dim, max_size) = sizes
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0), |best, (ii, s)| if s > best.1 { (ii, s) } else { best });
        if max_size <= 1 {
            return PixelTable {
                runs: vec![PixelRun {
                    coordinates: vec![0; nd],
                    length: 1,
                }],
                weights: None,
                sizes: vec![1; nd],
                origin: vec![0; nd],
                n_pixels: 1,
                proc_dim,
            };
        }
        let position = |k: usize| -> Vec<isize> {
            (0..nd)
                .map(|ii| {
                    // Integer Bresenham, error term starting at half a step.
                    let dx = max_size - 1;
                    let p = if ii == step_dim {
                        k
                    } else {
                        (k * (sizes[ii] - 1) + dx - dx / 2 - 1) / dx
                    };
                    if size[ii] < 0.0 {
                        (sizes[ii] - 1 - p) as isize
                    } else {
                        p as isize
                    }
                })
                .collect()
        };
        let center = position(max_size / 2);
        let mut runs: Vec<PixelRun> = Vec::new();
        for k in 0..max_size {
            let coords: Vec<isize> = position(k).iter().zip(&center).map(|(p, c)| p - c).collect();
            if let Some(run) = runs.last_mut() {
                let same_line = (0..nd).all(|ii| ii == proc_dim || run.coordinates[ii] == coords[ii]);
                if same_line {
                    let first = run.coordinates[proc_dim];
                    if coords[proc_dim] == first + run.length as isize {
                        run.length += 1;
                        continue;
                    }
                    if coords[proc_dim] == first - 1 {
                        run.coordinates[proc_dim] -= 1;
                        run.length += 1;
                        continue;
                    }
                }
            }
            runs.push(PixelRun {
                coordinates: coords,
                length: 1,
            });
        }
        PixelTable {
            runs,
            weights: None,
            sizes,
            origin: center.iter().map(|&c| -c).collect(),
            n_pixels: max_size,
            proc_dim,
        }
    }

    /// Table of the set pixels of a scalar binary `mask`. `origin` is the
    /// mask pixel placed at the neighbourhood origin; it defaults to the
    /// geometric centre `sizes / 2`.
    pub fn from_mask(mask: &Image, origin: Option<&[usize]>, proc_dim: usize) -> Result<Self> {
        mask.require_forged()?;
        if !mask.is_scalar() {
            return Err(Error::TensorElementsMismatch {
                expected: 1,
                actual: mask.tensor_elements(),
            });
        }
        if !mask.data_type().is_binary() {
            return Err(Error::DataTypeNotSupported(mask.data_type()));
        }
        let sizes = mask.sizes().to_vec();
        let nd = sizes.len();
        if nd == 0 {
            return Err(Error::geometry("mask needs at least one dimension"));
        }
        if proc_dim >= nd {
            return Err(Error::IndexOutOfRange {
                index: proc_dim as isize,
                size: nd,
            });
        }
        let center: Vec<usize> = match origin {
            Some(origin) => {
                check_length(origin.len(), nd)?;
                if let Some(ii) = (0..nd).find(|&ii| origin[ii] >= sizes[ii]) {
                    return Err(Error::IndexOutOfRange {
                        index: origin[ii] as isize,
                        size: sizes[ii],
                    });
                }
                origin.to_vec()
            }
            None => sizes.iter().map(|&s| s / 2).collect(),
        };
        let values = mask.to_vec::<Bin>()?;
        let zero = vec![0isize; nd];
        let mut line = zero.clone();
        let mut runs = Vec::new();
        let mut n_pixels = 0;
        loop {
            let mut coords: Vec<usize> = line.iter().map(|&c| c as usize).collect();
            let mut run_start: Option<usize> = None;
            for x in 0..=sizes[proc_dim] {
                let set = x < sizes[proc_dim] && {
                    coords[proc_dim] = x;
                    values[linear_index(&coords, &sizes)].is_set()
                };
                match (set, run_start) {
                    (true, None) => run_start = Some(x),
                    (false, Some(start)) => {
                        coords[proc_dim] = start;
                        runs.push(PixelRun {
                            coordinates: coords.iter().zip(&center).map(|(&c, &o)| c as isize - o as isize).collect(),
                            length: x - start,
                        });
                        n_pixels += x - start;
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if !next_line_coordinates(&mut line, &zero, &sizes, proc_dim) {
                break;
            }
        }
        debug!("pixel table from mask {:?}: {} runs, {} pixels", sizes, runs.len(), n_pixels);
        Ok(PixelTable {
            runs,
            weights: None,
            sizes,
            origin: center.iter().map(|&c| -(c as isize)).collect(),
            n_pixels,
            proc_dim,
        })
    }

    pub fn runs(&self) -> &[PixelRun] {
        &self.runs
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    /// Size of the bounding box.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Coordinates of the bounding box's first corner relative to the origin.
    pub fn origin(&self) -> &[isize] {
        &self.origin
    }

    pub fn number_of_pixels(&self) -> usize {
        self.n_pixels
    }

    pub fn processing_dimension(&self) -> usize {
        self.proc_dim
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// One weight per pixel, in run order.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Coordinates of every pixel relative to the origin, in run order.
    pub fn pixel_coordinates(&self) -> impl Iterator<Item = Vec<isize>> + '_ {
        let proc_dim = self.proc_dim;
        self.runs.iter().flat_map(move |run| {
            (0..run.length as isize).map(move |k| {
                let mut coords = run.coordinates.clone();
                coords[proc_dim] += k;
                coords
            })
        })
    }

    /// Renders the table over its bounding box: a binary mask, or a `DFloat`
    /// image of the weights when the table has them.
    pub fn as_image(&self) -> Result<Image> {
        let box_coords = |coords: &[isize]| -> Vec<usize> {
            coords.iter().zip(&self.origin).map(|(&c, &o)| (c - o) as usize).collect()
        };
        let n: usize = self.sizes.iter().product();
        match &self.weights {
            Some(weights) => {
                let mut data = vec![0.0f64; n];
                for (coords, &w) in self.pixel_coordinates().zip(weights) {
                    data[linear_index(&box_coords(&coords), &self.sizes)] = w;
                }
                Image::from_vec(&self.sizes, 1, data)
            }
            None => {
                let mut data = vec![Bin::FALSE; n];
                for coords in self.pixel_coordinates() {
                    data[linear_index(&box_coords(&coords), &self.sizes)] = Bin::TRUE;
                }
                Image::from_vec(&self.sizes, 1, data)
            }
        }
    }

    /// Moves every pixel by `-shift`, i.e. the pixel at `shift` becomes the
    /// new origin.
    pub fn shift_origin(&mut self, shift: &[isize]) -> Result<()> {
        check_length(shift.len(), self.dimensionality())?;
        for run in &mut self.runs {
            for (c, &s) in run.coordinates.iter_mut().zip(shift) {
                *c -= s;
            }
        }
        for (o, &s) in self.origin.iter_mut().zip(shift) {
            *o -= s;
        }
        Ok(())
    }

    /// Point-mirrors the neighbourhood through its origin.
    pub fn mirror(&mut self) {
        let proc_dim = self.proc_dim;
        for run in &mut self.runs {
            for (ii, c) in run.coordinates.iter_mut().enumerate() {
                *c = if ii == proc_dim {
                    -(*c + run.length as isize - 1)
                } else {
                    -*c
                };
            }
        }
        for (o, &s) in self.origin.iter_mut().zip(&self.sizes) {
            *o = -(*o + s as isize - 1);
        }
        // Pixels inside a run now come in reverse order.
        if let Some(weights) = &mut self.weights {
            let mut start = 0;
            for run in &self.runs {
                weights[start..start + run.length].reverse();
                start += run.length;
            }
        }
    }

    /// Reads one weight per pixel from `image`, a real scalar image with the
    /// sizes of the bounding box.
    pub fn add_weights(&mut self, image: &Image) -> Result<()> {
        image.require_forged()?;
        if !image.is_scalar() {
            return Err(Error::TensorElementsMismatch {
                expected: 1,
                actual: image.tensor_elements(),
            });
        }
        if image.data_type().is_complex() {
            return Err(Error::DataTypeNotSupported(image.data_type()));
        }
        if image.sizes() != self.sizes.as_slice() {
            return Err(Error::SizesMismatch);
        }
        let values = if image.data_type() == DataType::DFloat {
            image.to_vec::<f64>()?
        } else {
            image.convert(DataType::DFloat)?.to_vec::<f64>()?
        };
        let weights = self
            .pixel_coordinates()
            .map(|coords| {
                let local: Vec<usize> = coords.iter().zip(&self.origin).map(|(&c, &o)| (c - o) as usize).collect();
                values[linear_index(&local, &self.sizes)]
            })
            .collect();
        self.weights = Some(weights);
        Ok(())
    }

    /// Sets each pixel's weight to its Euclidean distance to the origin.
    pub fn add_distance_to_origin_as_weights(&mut self) {
        let proc_dim = self.proc_dim;
        let mut weights = Vec::with_capacity(self.n_pixels);
        for run in &self.runs {
            let mut distance2: isize = run.coordinates.iter().map(|&c| c * c).sum();
            let mut x = run.coordinates[proc_dim];
            weights.push((distance2 as f64).sqrt());
            for _ in 1..run.length {
                // (x + 1)^2 = x^2 + 2x + 1
                distance2 += 2 * x + 1;
                x += 1;
                weights.push((distance2 as f64).sqrt());
            }
        }
        self.weights = Some(weights);
    }

    /// Offsets of the table's pixels in an image with the strides of `image`.
    pub fn prepare(&self, image: &Image) -> Result<PixelTableOffsets> {
        PixelTableOffsets::new(self, image.strides())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_names_parse() {
        assert_eq!("diamond".parse::<PixelTableShape>().unwrap(), PixelTableShape::Diamond);
        assert!(matches!(
            "hexagonal".parse::<PixelTableShape>(),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            PixelTable::from_shape_name("star", &[3.0], 0),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn rectangle_covers_bounding_box() {
        let pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 2.9], 0).unwrap();
        assert_eq!(pt.sizes(), &[3, 2]);
        assert_eq!(pt.origin(), &[-1, -1]);
        assert_eq!(pt.runs().len(), 2);
        assert_eq!(pt.number_of_pixels(), 6);
        assert_eq!(pt.runs()[1].coordinates, vec![-1, 0]);
    }

    #[test]
    fn ellipse_matches_reference_counts() {
        let pt = PixelTable::new(PixelTableShape::Elliptic, &[10.1, 12.7, 5.3], 1).unwrap();
        assert_eq!(pt.sizes(), &[11, 13, 5]);
        assert_eq!(pt.origin(), &[-5, -6, -2]);
        assert_eq!(pt.runs().len(), 43);
        assert_eq!(pt.number_of_pixels(), 359);
        let total: usize = pt.runs().iter().map(|r| r.length).sum();
        assert_eq!(total, 359);
    }

    #[test]
    fn mask_round_trip_preserves_table() {
        let pt = PixelTable::new(PixelTableShape::Elliptic, &[10.1, 12.7, 5.3], 1).unwrap();
        let mask = pt.as_image().unwrap();
        assert_eq!(mask.data_type(), DataType::Bin);
        let back = PixelTable::from_mask(&mask, None, 1).unwrap();
        assert_eq!(back.sizes(), pt.sizes());
        assert_eq!(back.origin(), pt.origin());
        assert_eq!(back.runs(), pt.runs());
        assert_eq!(back.number_of_pixels(), 359);
    }

    #[test]
    fn diamond_shrinks_linearly() {
        let pt = PixelTable::new(PixelTableShape::Diamond, &[5.0, 5.0], 0).unwrap();
        let lengths: Vec<usize> = pt.runs().iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![1, 3, 5, 3, 1]);
        assert_eq!(pt.number_of_pixels(), 13);
    }

    #[test]
    fn line_merges_steps_into_runs() {
        let pt = PixelTable::new(PixelTableShape::Line, &[5.0, -3.0], 0).unwrap();
        assert_eq!(pt.sizes(), &[5, 3]);
        assert_eq!(pt.origin(), &[-2, -1]);
        assert_eq!(pt.number_of_pixels(), 5);
        let runs: Vec<(Vec<isize>, usize)> = pt.runs().iter().map(|r| (r.coordinates.clone(), r.length)).collect();
        assert_eq!(
            runs,
            vec![(vec![-2, 1], 2), (vec![0, 0], 2), (vec![2, -1], 1)]
        );
        let shallow = PixelTable::new(PixelTableShape::Line, &[5.0, 2.0], 0).unwrap();
        let ys: Vec<isize> = shallow.pixel_coordinates().map(|c| c[1] - shallow.origin()[1]).collect();
        assert_eq!(ys, vec![0, 0, 0, 1, 1]);
        let single = PixelTable::new(PixelTableShape::Line, &[0.4, 1.0], 1).unwrap();
        assert_eq!(single.number_of_pixels(), 1);
        assert_eq!(single.origin(), &[0, 0]);
    }

    #[test]
    fn mirror_flips_runs_and_origin() {
        let mut pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 2.0], 0).unwrap();
        pt.mirror();
        assert_eq!(pt.origin(), &[-1, 0]);
        assert_eq!(pt.runs()[0].coordinates, vec![-1, 1]);
        assert_eq!(pt.runs()[1].coordinates, vec![-1, 0]);
    }

    #[test]
    fn shift_origin_moves_pixels() {
        let mut pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0], 0).unwrap();
        pt.shift_origin(&[-1]).unwrap();
        assert_eq!(pt.origin(), &[0]);
        assert_eq!(pt.runs()[0].coordinates, vec![0]);
        assert!(pt.shift_origin(&[1, 1]).is_err());
    }

    #[test]
    fn distance_weights_follow_runs() {
        let mut pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 3.0], 0).unwrap();
        assert!(!pt.has_weights());
        pt.add_distance_to_origin_as_weights();
        let w = pt.weights().unwrap();
        let s2 = 2f64.sqrt();
        assert_eq!(w.len(), 9);
        for (got, want) in w.iter().zip([s2, 1.0, s2, 1.0, 0.0, 1.0, s2, 1.0, s2]) {
            assert!((got - want).abs() < 1e-12);
        }
        pt.mirror();
        assert_eq!(pt.weights().unwrap()[..3], [s2, 1.0, s2]);
    }

    #[test]
    fn weights_read_from_image_and_rendered_back() {
        let mut pt = PixelTable::new(PixelTableShape::Diamond, &[3.0, 3.0], 0).unwrap();
        let img = Image::from_vec(&[3, 3], 1, (1..=9u8).collect()).unwrap();
        pt.add_weights(&img).unwrap();
        assert_eq!(pt.weights().unwrap(), &[2.0, 4.0, 5.0, 6.0, 8.0]);
        let rendered = pt.as_image().unwrap();
        assert_eq!(rendered.data_type(), DataType::DFloat);
        assert_eq!(
            rendered.to_vec::<f64>().unwrap(),
            vec![0.0, 2.0, 0.0, 4.0, 5.0, 6.0, 0.0, 8.0, 0.0]
        );
        let wrong = Image::new(&[3, 4], 1, DataType::SFloat).unwrap();
        assert_eq!(pt.add_weights(&wrong), Err(Error::SizesMismatch));
    }

    #[test]
    fn mask_must_be_binary() {
        let img = Image::new(&[3, 3], 1, DataType::UInt8).unwrap();
        assert_eq!(
            PixelTable::from_mask(&img, None, 0),
            Err(Error::DataTypeNotSupported(DataType::UInt8))
        );
    }
}
