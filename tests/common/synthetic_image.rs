#![allow(dead_code)]

use strided_image::Image;

/// Generates a simple high-contrast checkerboard image.
pub fn checkerboard_u8(width: usize, height: usize, cell: usize) -> Image {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let cx = (x / cell) as i32;
            let cy = (y / cell) as i32;
            let sum = cx + cy;
            let val = if sum & 1 == 0 { 32u8 } else { 220u8 };
            data[y * width + x] = val;
        }
    }
    Image::from_vec(&[width, height], 1, data).expect("checkerboard image")
}

/// Image whose sample at linear index `i` equals `i`, as `f32`.
pub fn ramp_f32(sizes: &[usize]) -> Image {
    let n: usize = sizes.iter().product();
    Image::from_vec(sizes, 1, (0..n).map(|i| i as f32).collect()).expect("ramp image")
}

/// Deterministic pseudo-random samples in `[0, 1)`.
pub fn noise_f64(sizes: &[usize], tensor_elements: usize, seed: u64) -> Image {
    let n: usize = sizes.iter().product::<usize>() * tensor_elements;
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let data = (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect();
    Image::from_vec(sizes, tensor_elements, data).expect("noise image")
}
