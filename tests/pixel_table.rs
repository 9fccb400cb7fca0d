mod common;

use common::synthetic_image::ramp_f32;
use strided_image::pixel_table::{PixelTable, PixelTableShape};
use strided_image::{DataType, Error, Image};

#[test]
fn rectangle_pixel_count_is_product_of_sizes() {
    for (w, h) in [(1usize, 1usize), (3, 5), (4, 4), (7, 2)] {
        let pt = PixelTable::new(PixelTableShape::Rectangular, &[w as f64, h as f64], 1).unwrap();
        assert_eq!(pt.number_of_pixels(), w * h, "size {w}x{h}");
        assert_eq!(pt.runs().len(), w);
        assert!(pt.runs().iter().all(|r| r.length == h));
    }
}

#[test]
fn elliptic_reference_neighbourhood() {
    let pt = PixelTable::from_shape_name("elliptic", &[10.1, 12.7, 5.3], 1).unwrap();
    assert_eq!(pt.sizes(), &[11, 13, 5]);
    assert_eq!(pt.origin(), &[-5, -6, -2]);
    assert_eq!(pt.runs().len(), 43);
    assert_eq!(pt.number_of_pixels(), 359);
    assert_eq!(pt.processing_dimension(), 1);
}

#[test]
fn shapes_survive_a_mask_round_trip() {
    let tables = [
        PixelTable::new(PixelTableShape::Elliptic, &[7.0, 9.5], 0).unwrap(),
        PixelTable::new(PixelTableShape::Diamond, &[9.0, 5.0, 3.0], 2).unwrap(),
        PixelTable::new(PixelTableShape::Line, &[7.0, 3.0], 0).unwrap(),
        PixelTable::new(PixelTableShape::Rectangular, &[4.0, 3.0], 1).unwrap(),
    ];
    for pt in &tables {
        let mask = pt.as_image().unwrap();
        let origin: Vec<usize> = pt.origin().iter().map(|&o| (-o) as usize).collect();
        let back = PixelTable::from_mask(&mask, Some(&origin), pt.processing_dimension()).unwrap();
        assert_eq!(back.sizes(), pt.sizes());
        assert_eq!(back.origin(), pt.origin());
        assert_eq!(back.number_of_pixels(), pt.number_of_pixels());
        let mut a: Vec<Vec<isize>> = pt.pixel_coordinates().collect();
        let mut b: Vec<Vec<isize>> = back.pixel_coordinates().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}

#[test]
fn runs_never_overlap() {
    let pt = PixelTable::new(PixelTableShape::Diamond, &[11.0, 11.0], 0).unwrap();
    let mut coords: Vec<Vec<isize>> = pt.pixel_coordinates().collect();
    let n = coords.len();
    coords.sort();
    coords.dedup();
    assert_eq!(coords.len(), n);
    assert_eq!(n, pt.number_of_pixels());
}

#[test]
fn offsets_sum_a_neighbourhood() {
    let img = ramp_f32(&[10, 8]);
    let pt = PixelTable::new(PixelTableShape::Diamond, &[3.0, 3.0], 0).unwrap();
    let offsets = pt.prepare(&img).unwrap();
    let data = img.to_vec::<f32>().unwrap();
    let center = img.index(&[4, 3]).unwrap() as isize;
    let sum: f32 = offsets.iter().map(|o| data[(center + o) as usize]).sum();
    // The ramp is linear, so the symmetric neighbourhood averages to the centre value.
    assert_eq!(sum, 5.0 * data[center as usize]);
}

#[test]
fn offsets_follow_custom_strides() {
    let mut img = Image::new(&[6, 5], 1, DataType::SFloat).unwrap();
    img.swap_dimensions(0, 1).unwrap();
    let pt = PixelTable::new(PixelTableShape::Rectangular, &[3.0, 1.0], 0).unwrap();
    let offsets = pt.prepare(&img).unwrap();
    assert_eq!(offsets.stride(), img.stride(0));
    assert_eq!(offsets.offsets(), vec![-img.stride(0), 0, img.stride(0)]);
}

#[test]
fn invalid_requests_are_rejected() {
    assert!(matches!(
        PixelTable::from_shape_name("hexagon", &[3.0], 0),
        Err(Error::InvalidGeometry(_))
    ));
    assert!(PixelTable::new(PixelTableShape::Elliptic, &[3.0, 3.0], 2).is_err());
    assert!(PixelTable::new(PixelTableShape::Diamond, &[-1.0], 0).is_err());
    let mask = Image::new(&[3, 3], 1, DataType::Bin).unwrap();
    assert!(PixelTable::from_mask(&mask, Some(&[3, 0]), 0).is_err());
    let empty = PixelTable::from_mask(&mask, None, 0).unwrap();
    assert_eq!(empty.number_of_pixels(), 0);
}
