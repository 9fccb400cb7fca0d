//! Boundary conditions and the operations that synthesize samples outside
//! an image from them.

use super::{expand_buffer, SampleLineMut};
use crate::datatype::{dispatch_type, Sample, Value};
use crate::error::{array_use_parameter, check_length, Error, Result};
use crate::image::copy::copy_samples;
use crate::image::{Image, Range};
use crate::iterators::GenericImageIterator;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How samples beyond the edge of an image are defined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum BoundaryCondition {
    #[default]
    SymmetricMirror,
    /// Mirror with inverted values.
    AsymmetricMirror,
    Periodic,
    /// Periodic with inverted values.
    AsymmetricPeriodic,
    AddZeros,
    AddMaxValue,
    AddMinValue,
    ZeroOrderExtrapolate,
    FirstOrderExtrapolate,
    SecondOrderExtrapolate,
    ThirdOrderExtrapolate,
}

impl BoundaryCondition {
    pub const ALL: [BoundaryCondition; 11] = [
        BoundaryCondition::SymmetricMirror,
        BoundaryCondition::AsymmetricMirror,
        BoundaryCondition::Periodic,
        BoundaryCondition::AsymmetricPeriodic,
        BoundaryCondition::AddZeros,
        BoundaryCondition::AddMaxValue,
        BoundaryCondition::AddMinValue,
        BoundaryCondition::ZeroOrderExtrapolate,
        BoundaryCondition::FirstOrderExtrapolate,
        BoundaryCondition::SecondOrderExtrapolate,
        BoundaryCondition::ThirdOrderExtrapolate,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BoundaryCondition::SymmetricMirror => "mirror",
            BoundaryCondition::AsymmetricMirror => "asym mirror",
            BoundaryCondition::Periodic => "periodic",
            BoundaryCondition::AsymmetricPeriodic => "asym periodic",
            BoundaryCondition::AddZeros => "add zeros",
            BoundaryCondition::AddMaxValue => "add max",
            BoundaryCondition::AddMinValue => "add min",
            BoundaryCondition::ZeroOrderExtrapolate => "zero order",
            BoundaryCondition::FirstOrderExtrapolate => "first order",
            BoundaryCondition::SecondOrderExtrapolate => "second order",
            BoundaryCondition::ThirdOrderExtrapolate => "third order",
        }
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoundaryCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "default" {
            return Ok(BoundaryCondition::default());
        }
        BoundaryCondition::ALL
            .into_iter()
            .find(|bc| bc.name() == s)
            .ok_or_else(|| Error::parameter(format!("boundary condition \"{s}\" not recognized")))
    }
}

impl TryFrom<String> for BoundaryCondition {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<BoundaryCondition> for &'static str {
    fn from(bc: BoundaryCondition) -> Self {
        bc.name()
    }
}

/// One boundary condition per dimension: empty means the default, a single
/// value applies to all dimensions.
pub fn boundary_array_use_parameter(
    boundary_conditions: &[BoundaryCondition],
    n_dims: usize,
) -> Result<Vec<BoundaryCondition>> {
    array_use_parameter(boundary_conditions, n_dims, BoundaryCondition::default())
}

/// Reads the pixel at `coords`, which may lie outside the image, applying
/// the boundary condition of each dimension. Constant policies yield
/// `0`, `+inf` or `-inf` for out-of-image pixels.
pub fn read_pixel_with_boundary_condition(
    image: &Image,
    coords: &[isize],
    boundary_conditions: &[BoundaryCondition],
) -> Result<Vec<Value>> {
    image.require_forged()?;
    let nd = image.dimensionality();
    check_length(coords.len(), nd)?;
    let bc = boundary_array_use_parameter(boundary_conditions, nd)?;
    let te = image.tensor_elements();

    let mut inside = Vec::with_capacity(nd);
    let mut invert = false;
    for ii in 0..nd {
        let size = image.size(ii) as isize;
        let c = coords[ii];
        if (0..size).contains(&c) {
            inside.push(c as usize);
            continue;
        }
        let mapped = match bc[ii] {
            BoundaryCondition::SymmetricMirror | BoundaryCondition::AsymmetricMirror => {
                let m = c.rem_euclid(2 * size);
                if m >= size {
                    2 * size - 1 - m
                } else {
                    m
                }
            }
            BoundaryCondition::Periodic | BoundaryCondition::AsymmetricPeriodic => c.rem_euclid(size),
            BoundaryCondition::AddZeros => return Ok(vec![Value::Float(0.0); te]),
            BoundaryCondition::AddMaxValue => return Ok(vec![Value::Float(f64::INFINITY); te]),
            BoundaryCondition::AddMinValue => return Ok(vec![Value::Float(f64::NEG_INFINITY); te]),
            BoundaryCondition::ZeroOrderExtrapolate => c.clamp(0, size - 1),
            bc @ (BoundaryCondition::FirstOrderExtrapolate
            | BoundaryCondition::SecondOrderExtrapolate
            | BoundaryCondition::ThirdOrderExtrapolate) => {
                return Err(Error::parameter(format!(
                    "boundary condition \"{bc}\" not implemented for single-pixel reads"
                )));
            }
        };
        if matches!(
            bc[ii],
            BoundaryCondition::AsymmetricMirror | BoundaryCondition::AsymmetricPeriodic
        ) {
            invert = !invert;
        }
        inside.push(mapped as usize);
    }

    let offset = image.offset(&inside)?;
    let ptr = image.pointer(offset);
    let tstride = image.tensor_stride();
    let values = dispatch_type!(image.data_type(), T => {
        (0..te as isize)
            .map(|jj| {
                // In bounds: `inside` was validated by `offset`.
                let v = unsafe { ptr.cast::<T>().offset(jj * tstride).read() };
                if invert {
                    v.saturated_inv().to_value()
                } else {
                    v.to_value()
                }
            })
            .collect::<Vec<Value>>()
    });
    Ok(values)
}

/// Fills the part of `image` outside `ranges` from the samples inside it.
/// Each range must have unit step.
pub fn extend_region(
    image: &mut Image,
    ranges: &[Range],
    boundary_conditions: &[BoundaryCondition],
) -> Result<()> {
    image.require_forged()?;
    let nd = image.dimensionality();
    check_length(ranges.len(), nd)?;
    let bc = boundary_array_use_parameter(boundary_conditions, nd)?;
    let mut ranges = ranges.to_vec();
    for (range, &size) in ranges.iter_mut().zip(image.sizes()) {
        range.fix(size)?;
        if range.signed_step() != 1 {
            return Err(Error::parameter("extension ranges must have a step of 1"));
        }
    }
    let data_type = image.data_type();
    let te = image.tensor_elements();
    for dim in 0..nd {
        let left = ranges[dim].offset() as usize;
        let right = image.size(dim) - 1 - ranges[dim].stop as usize;
        if left == 0 && right == 0 {
            continue;
        }
        let view = image.at(&ranges)?;
        let mut it = GenericImageIterator::new(&view, Some(dim))?;
        loop {
            let line = SampleLineMut::new(it.pointer(), data_type, view.stride(dim), view.tensor_stride());
            // The border samples lie inside `image`.
            unsafe { expand_buffer(line, view.size(dim), te, left, right, bc[dim]) };
            if !it.next_line() {
                break;
            }
        }
        ranges[dim] = Range::all();
    }
    Ok(())
}

/// Writes into `output` a copy of `input` grown by `border` samples on both
/// sides of each dimension, filled according to the boundary conditions.
pub fn extend_image(
    input: &Image,
    output: &mut Image,
    border: &[usize],
    boundary_conditions: &[BoundaryCondition],
) -> Result<()> {
    input.require_forged()?;
    let nd = input.dimensionality();
    let border = array_use_parameter(border, nd, 0)?;
    let sizes: Vec<usize> = input
        .sizes()
        .iter()
        .zip(&border)
        .map(|(&size, &b)| size + 2 * b)
        .collect();
    if output.aliases(input) {
        output.strip();
    }
    output.reforge(&sizes, input.tensor_elements(), input.data_type())?;
    output.reshape_tensor(*input.tensor())?;
    output.set_color_space(input.color_space());
    debug!("extending image {:?} to {:?}", input.sizes(), sizes);

    let window: Vec<Range> = input
        .sizes()
        .iter()
        .zip(&border)
        .map(|(&size, &b)| Range::new(b as isize, (b + size) as isize - 1))
        .collect();
    let target = output.at(&window)?;
    copy_samples(input, &target, &[])?;
    extend_region(output, &window, boundary_conditions)
}
