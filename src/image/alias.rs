//! Overlap tests between views of the same data block.

use super::data::{offset_to_coordinates, simple_stride_size_and_start};
use super::Image;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Sizes and strides of a view, tensor dimension included, with samples split
/// into `split` sub-samples.
fn geometry(img: &Image, split: usize) -> (Vec<usize>, Vec<isize>) {
    let mut sizes = img.sizes().to_vec();
    let mut strides = img.strides().to_vec();
    if img.tensor_elements() > 1 {
        sizes.push(img.tensor_elements());
        strides.push(img.tensor_stride());
    }
    if split > 1 {
        for s in strides.iter_mut() {
            *s *= split as isize;
        }
        strides.push(1);
        sizes.push(split);
    }
    (sizes, strides)
}

/// Drops singleton dimensions, makes strides positive (moving `origin` to the
/// lowest sample) and sorts by stride.
fn normalize(sizes: Vec<usize>, strides: Vec<isize>, origin: &mut isize) -> Vec<(usize, usize)> {
    let mut dims: Vec<(usize, usize)> = sizes
        .into_iter()
        .zip(strides)
        .filter(|&(size, _)| size > 1)
        .map(|(size, stride)| {
            if stride < 0 {
                *origin += (size as isize - 1) * stride;
            }
            (stride.unsigned_abs(), size)
        })
        .collect();
    dims.sort_by_key(|&(stride, _)| stride);
    dims
}

impl Image {
    /// True if the two images share at least one sample.
    pub fn aliases(&self, other: &Image) -> bool {
        if !self.shares_data_block(other) {
            return false;
        }
        if self.origin_bytes() == other.origin_bytes() {
            return true;
        }

        let dts1 = self.data_type().size_of();
        let dts2 = other.data_type().size_of();
        let dts = dts1.min(dts2);
        let (sizes1, strides1) = geometry(self, dts1 / dts);
        let (sizes2, strides2) = geometry(other, dts2 / dts);

        // Offsets from the start of the block, in units of the smaller sample.
        let mut origin1 = (self.origin_bytes() / dts) as isize;
        let mut origin2 = (other.origin_bytes() / dts) as isize;

        let (sstride1, size1, start1) = simple_stride_size_and_start(&strides1, &sizes1);
        let (sstride2, size2, start2) = simple_stride_size_and_start(&strides2, &sizes2);
        let start1 = start1 + origin1;
        let start2 = start2 + origin2;
        if sstride1 > 1 && sstride1 == sstride2 && (start1 - start2) % sstride1 != 0 {
            return false;
        }
        if start1 + size1 as isize <= start2 || start2 + size2 as isize <= start1 {
            return false;
        }

        let dims1 = normalize(sizes1, strides1, &mut origin1);
        let dims2 = normalize(sizes2, strides2, &mut origin2);
        let base = origin1.min(origin2);
        origin1 -= base;
        origin2 -= base;

        // Match up the dimensions of both views on a common set of strides.
        let mut common = Vec::new();
        let mut new1 = Vec::new();
        let mut new2 = Vec::new();
        let mut i1 = dims1.iter().take_while(|d| d.0 == 0).count();
        let mut i2 = dims2.iter().take_while(|d| d.0 == 0).count();
        while i1 < dims1.len() || i2 < dims2.len() {
            let (mut s1, mut d1) = dims1.get(i1).copied().unwrap_or((0, 1));
            let (mut s2, mut d2) = dims2.get(i2).copied().unwrap_or((0, 1));
            if s1 == 0 {
                s1 = s2;
                i2 += 1;
            } else if s2 == 0 {
                s2 = s1;
                i1 += 1;
            } else if i1 + 1 < dims1.len() && dims1[i1 + 1].0 <= s2 * (d2 - 1) {
                s2 = s1;
                d2 = 1;
                i1 += 1;
            } else if i2 + 1 < dims2.len() && dims2[i2 + 1].0 <= s1 * (d1 - 1) {
                s1 = s2;
                d1 = 1;
                i2 += 1;
            } else {
                i1 += 1;
                i2 += 1;
            }
            let cs = if common.is_empty() { 1 } else { gcd(s1, s2) };
            common.push(cs);
            new1.push((s1 / cs, d1));
            new2.push((s2 / cs, d2));
        }

        let coords1 = offset_to_coordinates(origin1 as usize, &common);
        let coords2 = offset_to_coordinates(origin2 as usize, &common);
        for ii in 0..common.len() {
            let (ns1, nd1) = new1[ii];
            let (ns2, nd2) = new2[ii];
            let (o1, o2) = (coords1[ii], coords2[ii]);
            if o1 + (nd1 - 1) * ns1 < o2 || o2 + (nd2 - 1) * ns2 < o1 {
                return false;
            }
            if ns1 == ns2 && ns1 > 1 && (o1 as isize - o2 as isize) % ns1 as isize != 0 {
                return false;
            }
        }
        true
    }

    /// Same data, same geometry, same type.
    pub fn is_identical_view(&self, other: &Image) -> bool {
        self.shares_data_block(other)
            && self.origin_bytes() == other.origin_bytes()
            && self.data_type() == other.data_type()
            && self.sizes() == other.sizes()
            && self.strides() == other.strides()
            && self.tensor_elements() == other.tensor_elements()
            && (self.tensor_elements() == 1 || self.tensor_stride() == other.tensor_stride())
    }

    /// Shares samples with `other` without being an identical view of it.
    pub fn is_overlapping_view(&self, other: &Image) -> bool {
        self.aliases(other) && !self.is_identical_view(other)
    }
}
