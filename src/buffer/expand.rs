use super::boundary::BoundaryCondition;
use super::SampleLineMut;
use crate::datatype::{dispatch_type, DataType, Sample, Value};

/// Fills `left` samples before and `right` samples after a line of `pixels`
/// valid samples according to `boundary_condition`.
///
/// Complex lines are expanded as two independent real lines. Polynomial
/// extrapolation falls back to a lower order when the line is too short.
///
/// # Safety
/// `buffer` must address `pixels` readable samples, and the `left`/`right`
/// samples beyond them must be valid for writes, for every tensor element.
pub unsafe fn expand_buffer(
    buffer: SampleLineMut,
    pixels: usize,
    tensor_elements: usize,
    left: usize,
    right: usize,
    boundary_condition: BoundaryCondition,
) {
    if left == 0 && right == 0 {
        return;
    }
    debug_assert!(pixels > 0, "cannot expand an empty line");
    match buffer.data_type {
        DataType::SComplex => expand_complex::<f32>(buffer, pixels, tensor_elements, left, right, boundary_condition),
        DataType::DComplex => expand_complex::<f64>(buffer, pixels, tensor_elements, left, right, boundary_condition),
        dt => dispatch_type!(dt, T => {
            expand_typed::<T>(
                buffer.ptr.cast::<T>(),
                buffer.stride,
                buffer.tensor_stride,
                pixels,
                tensor_elements,
                left,
                right,
                boundary_condition,
            )
        }),
    }
}

unsafe fn expand_complex<R: Sample>(
    buffer: SampleLineMut,
    pixels: usize,
    tensor_elements: usize,
    left: usize,
    right: usize,
    bc: BoundaryCondition,
) {
    let re = buffer.ptr.cast::<R>();
    for component in [re, re.wrapping_add(1)] {
        expand_typed::<R>(
            component,
            buffer.stride * 2,
            buffer.tensor_stride * 2,
            pixels,
            tensor_elements,
            left,
            right,
            bc,
        );
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn expand_typed<T: Sample>(
    buffer: *mut T,
    stride: isize,
    tensor_stride: isize,
    pixels: usize,
    tensor_elements: usize,
    left: usize,
    right: usize,
    bc: BoundaryCondition,
) {
    for jj in 0..tensor_elements as isize {
        let line = Line {
            base: buffer.wrapping_offset(jj * tensor_stride),
            stride,
            pixels: pixels as isize,
        };
        line.expand(left, right, bc);
    }
}

struct Line<T> {
    base: *mut T,
    stride: isize,
    pixels: isize,
}

impl<T: Sample> Line<T> {
    unsafe fn read(&self, index: isize) -> T {
        self.base.wrapping_offset(index * self.stride).read()
    }

    unsafe fn write(&self, index: isize, value: T) {
        self.base.wrapping_offset(index * self.stride).write(value)
    }

    unsafe fn read_f64(&self, index: isize) -> f64 {
        self.read(index).to_f64()
    }

    unsafe fn constant(&self, left: usize, right: usize, left_value: T, right_value: T) {
        for k in 1..=left as isize {
            self.write(-k, left_value);
        }
        for k in 0..right as isize {
            self.write(self.pixels + k, right_value);
        }
    }

    /// Copies (optionally inverted) samples from the index `map` gives for
    /// each border position.
    unsafe fn remap(&self, left: usize, right: usize, invert: bool, map: impl Fn(isize) -> isize) {
        let value = |j: isize| {
            let v = self.read(map(j));
            if invert {
                v.saturated_inv()
            } else {
                v
            }
        };
        for k in 1..=left as isize {
            self.write(-k, value(-k));
        }
        for k in 0..right as isize {
            let j = self.pixels + k;
            self.write(j, value(j));
        }
    }

    unsafe fn first_order(&self, left: usize, right: usize) {
        let p = self.pixels;
        for (count, edge, inner, dir) in [(left, 0, 1, -1), (right, p - 1, p - 2, 1)] {
            let mut d0 = self.read_f64(edge);
            let d1 = d0 - self.read_f64(inner);
            for k in 1..=count as isize {
                d0 += d1;
                self.write(edge + dir * k, T::from_f64(d0));
            }
        }
    }

    /// Quadratic through the two edge samples that reaches zero one sample
    /// past the border.
    unsafe fn second_order(&self, left: usize, right: usize) {
        let p = self.pixels;
        for (count, edge, inner, dir) in [(left, 0, 1, -1), (right, p - 1, p - 2, 1)] {
            if count == 0 {
                continue;
            }
            let b = count as f64 + 1.0;
            let d0 = self.read_f64(edge);
            let f1 = self.read_f64(inner);
            let d1 = (b - 1.0) / b * d0 - b / (b + 1.0) * f1;
            let d2 = -1.0 / b * d0 + 1.0 / (b + 1.0) * f1;
            for k in 1..=count as isize {
                let x = k as f64;
                self.write(edge + dir * k, T::from_f64(d0 + x * d1 + x * x * d2));
            }
        }
    }

    /// Cubic through the two edge samples that reaches zero with zero slope
    /// one sample past the border.
    unsafe fn third_order(&self, left: usize, right: usize) {
        let p = self.pixels;
        for (count, edge, inner, dir) in [(left, 0, 1, -1), (right, p - 1, p - 2, 1)] {
            if count == 0 {
                continue;
            }
            let b = count as f64 + 1.0;
            let b12 = (b + 1.0) * (b + 1.0);
            let d0 = self.read_f64(edge);
            let f1 = self.read_f64(inner);
            let d1 = -(2.0 * d0) / b + d0 - (b * b * f1) / b12;
            let d2 = (2.0 * b * f1) / b12 - (d0 * (2.0 * b - 1.0)) / (b * b);
            let d3 = d0 / (b * b) - f1 / b12;
            for k in 1..=count as isize {
                let x = k as f64;
                let v = d0 + x * d1 + x * x * d2 + x * x * x * d3;
                self.write(edge + dir * k, T::from_f64(v));
            }
        }
    }

    unsafe fn expand(&self, left: usize, right: usize, bc: BoundaryCondition) {
        use BoundaryCondition as BC;
        let p = self.pixels;
        match bc {
            BC::SymmetricMirror | BC::AsymmetricMirror | BC::Periodic | BC::AsymmetricPeriodic => {
                let invert = matches!(bc, BC::AsymmetricMirror | BC::AsymmetricPeriodic);
                if p == 1 {
                    self.remap(left, right, invert, |_| 0);
                } else if matches!(bc, BC::Periodic | BC::AsymmetricPeriodic) {
                    self.remap(left, right, invert, |j| j.rem_euclid(p));
                } else {
                    self.remap(left, right, invert, |j| {
                        let m = j.rem_euclid(2 * p);
                        if m >= p {
                            2 * p - 1 - m
                        } else {
                            m
                        }
                    });
                }
            }
            BC::AddZeros => {
                let zero = T::from_value(Value::Int(0));
                self.constant(left, right, zero, zero);
            }
            BC::AddMaxValue => self.constant(left, right, T::max_value(), T::max_value()),
            BC::AddMinValue => self.constant(left, right, T::lowest(), T::lowest()),
            BC::ThirdOrderExtrapolate if p > 2 => self.third_order(left, right),
            BC::ThirdOrderExtrapolate | BC::SecondOrderExtrapolate if p > 1 => {
                self.second_order(left, right)
            }
            BC::FirstOrderExtrapolate if p > 1 => self.first_order(left, right),
            BC::ZeroOrderExtrapolate
            | BC::FirstOrderExtrapolate
            | BC::SecondOrderExtrapolate
            | BC::ThirdOrderExtrapolate => {
                self.constant(left, right, self.read(0), self.read(p - 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs `expand_buffer` on `values` with `border` samples on each side and
    /// returns the whole expanded line.
    fn expand<T: Sample>(values: &[T], border: usize, bc: BoundaryCondition) -> Vec<T> {
        let mut data = vec![T::default(); values.len() + 2 * border];
        data[border..border + values.len()].copy_from_slice(values);
        let line = SampleLineMut::new(
            data.as_mut_ptr().wrapping_add(border).cast(),
            T::DATA_TYPE,
            1,
            1,
        );
        unsafe { expand_buffer(line, values.len(), 1, border, border, bc) };
        data
    }

    #[test]
    fn zero_borders_leave_buffer_untouched() {
        for bc in BoundaryCondition::ALL {
            assert_eq!(expand(&[1u8, 2, 3], 0, bc), vec![1, 2, 3], "{bc}");
        }
    }

    #[test]
    fn symmetric_mirror_reflects_edge_samples() {
        let out = expand(&[1i32, 2, 3, 4], 3, BoundaryCondition::SymmetricMirror);
        assert_eq!(out, vec![3, 2, 1, 1, 2, 3, 4, 4, 3, 2]);
        // Border longer than the line keeps reflecting.
        let out = expand(&[1i32, 2], 5, BoundaryCondition::SymmetricMirror);
        assert_eq!(out, vec![1, 1, 2, 2, 1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn asymmetric_mirror_inverts() {
        let out = expand(&[10u8, 20], 2, BoundaryCondition::AsymmetricMirror);
        assert_eq!(out, vec![235, 245, 10, 20, 235, 245]);
    }

    #[test]
    fn periodic_wraps() {
        let out = expand(&[1.0f32, 2.0, 3.0], 4, BoundaryCondition::Periodic);
        assert_eq!(out, vec![3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
        let out = expand(&[1i16, 2, 3], 1, BoundaryCondition::AsymmetricPeriodic);
        assert_eq!(out, vec![-3, 1, 2, 3, -1]);
    }

    #[test]
    fn constant_policies() {
        assert_eq!(expand(&[5u16], 1, BoundaryCondition::AddZeros), vec![0, 5, 0]);
        assert_eq!(expand(&[5u16], 1, BoundaryCondition::AddMaxValue), vec![u16::MAX, 5, u16::MAX]);
        assert_eq!(expand(&[5i8], 1, BoundaryCondition::AddMinValue), vec![i8::MIN, 5, i8::MIN]);
        assert_eq!(expand(&[4i32, 9], 2, BoundaryCondition::ZeroOrderExtrapolate), vec![4, 4, 4, 9, 9, 9]);
    }

    #[test]
    fn single_pixel_lines_replicate() {
        assert_eq!(expand(&[7i32], 2, BoundaryCondition::SymmetricMirror), vec![7; 5]);
        assert_eq!(expand(&[7i32], 1, BoundaryCondition::AsymmetricPeriodic), vec![-7, 7, -7]);
        assert_eq!(expand(&[7i32], 2, BoundaryCondition::ThirdOrderExtrapolate), vec![7; 5]);
    }

    #[test]
    fn first_order_continues_the_slope() {
        let out = expand(&[1.0f64, 3.0], 2, BoundaryCondition::FirstOrderExtrapolate);
        assert_eq!(out, vec![-3.0, -1.0, 1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn higher_orders_decay_to_zero() {
        let values = [4.0f64, 4.0, 4.0, 4.0];
        for bc in [
            BoundaryCondition::SecondOrderExtrapolate,
            BoundaryCondition::ThirdOrderExtrapolate,
        ] {
            let out = expand(&values, 3, bc);
            // Just inside the border the polynomial stays close to the edge
            // value; it reaches zero one step past the border.
            assert!(out[2] > 0.0 && out[2] <= 4.0, "{bc}: {out:?}");
            assert!(out[0].abs() < out[2].abs(), "{bc}: {out:?}");
            assert_eq!(&out[3..7], &values, "{bc}");
        }
    }

    #[test]
    fn third_order_degrades_to_second_order_for_two_samples() {
        let third = expand(&[2.0f64, 6.0], 3, BoundaryCondition::ThirdOrderExtrapolate);
        let second = expand(&[2.0f64, 6.0], 3, BoundaryCondition::SecondOrderExtrapolate);
        assert_eq!(third, second);
    }

    #[test]
    fn complex_components_expand_independently() {
        use num_complex::Complex64;
        let values = [Complex64::new(1.0, -1.0), Complex64::new(2.0, -2.0)];
        let out = expand(&values, 1, BoundaryCondition::Periodic);
        assert_eq!(out[0], Complex64::new(2.0, -2.0));
        assert_eq!(out[3], Complex64::new(1.0, -1.0));
    }
}
