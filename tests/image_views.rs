mod common;

use common::synthetic_image::{checkerboard_u8, ramp_f32};
use strided_image::buffer::read_pixel_with_boundary_condition;
use strided_image::filters::{downsample, gaussian_blur};
use strided_image::{BoundaryCondition, DataType, Image, Range};

fn line(values: &[u8]) -> Image {
    Image::from_vec(&[values.len()], 1, values.to_vec()).unwrap()
}

#[test]
fn extend_applies_each_boundary_condition() {
    let img = line(&[1, 2, 3]);
    let cases = [
        (BoundaryCondition::SymmetricMirror, vec![2u8, 1, 1, 2, 3, 3, 2]),
        (BoundaryCondition::Periodic, vec![2, 3, 1, 2, 3, 1, 2]),
        (BoundaryCondition::ZeroOrderExtrapolate, vec![1, 1, 1, 2, 3, 3, 3]),
        (BoundaryCondition::AddZeros, vec![0, 0, 1, 2, 3, 0, 0]),
    ];
    for (bc, expected) in cases {
        let out = img.extend(&[2], &[bc]).unwrap();
        assert_eq!(out.sizes(), &[7]);
        assert_eq!(out.to_vec::<u8>().unwrap(), expected, "{bc}");
    }
}

#[test]
fn extend_uses_per_dimension_conditions() {
    let img = Image::from_vec(&[2, 2], 1, vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
    let out = img
        .extend(&[1, 0], &[BoundaryCondition::AddZeros, BoundaryCondition::Periodic])
        .unwrap();
    assert_eq!(out.sizes(), &[4, 2]);
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![0.0, 1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0]);
}

#[test]
fn single_pixel_reads_outside_the_image() {
    let img = line(&[1, 2, 3]);
    let read = |c: isize, bc: BoundaryCondition| {
        read_pixel_with_boundary_condition(&img, &[c], &[bc]).unwrap()[0].as_f64()
    };
    assert_eq!(read(-1, BoundaryCondition::SymmetricMirror), 1.0);
    assert_eq!(read(4, BoundaryCondition::SymmetricMirror), 2.0);
    assert_eq!(read(-1, BoundaryCondition::Periodic), 3.0);
    assert_eq!(read(10, BoundaryCondition::ZeroOrderExtrapolate), 3.0);
    assert_eq!(read(-5, BoundaryCondition::AddZeros), 0.0);
    assert_eq!(read(3, BoundaryCondition::AddMaxValue), f64::INFINITY);
    assert_eq!(read(1, BoundaryCondition::AddMinValue), 2.0);
    assert!(read_pixel_with_boundary_condition(&img, &[5], &[BoundaryCondition::FirstOrderExtrapolate]).is_err());
}

#[test]
fn fill_touches_only_the_view() {
    let img = Image::new(&[6], 1, DataType::UInt16).unwrap();
    let mut every_other = img.at(&[Range::with_step(0, -1, 2)]).unwrap();
    every_other.fill(7u16).unwrap();
    assert_eq!(img.to_vec::<u16>().unwrap(), vec![7, 0, 7, 0, 7, 0]);
    assert!(every_other.aliases(&img));
    assert!(!every_other.at(&[Range::new(0, 0)]).unwrap().aliases(&img.at(&[Range::new(1, 1)]).unwrap()));
}

#[test]
fn interleaved_views_do_not_alias() {
    let img = ramp_f32(&[8, 4]);
    let even = img.at(&[Range::with_step(0, -1, 2), Range::all()]).unwrap();
    let odd = img.at(&[Range::with_step(1, -1, 2), Range::all()]).unwrap();
    assert!(!even.aliases(&odd));
    assert!(even.is_overlapping_view(&img));
    let mut reversed = img.clone();
    reversed.mirror(&[true, false]).unwrap();
    assert!(reversed.aliases(&img));
    assert!(!reversed.is_identical_view(&img));
}

#[test]
fn overlapping_copy_reads_sources_before_overwriting() {
    let img = Image::from_vec(&[10], 1, (0u8..10).collect::<Vec<_>>()).unwrap();
    let mut head = img.at(&[Range::new(0, 7)]).unwrap();
    let tail = img.at(&[Range::new(2, 9)]).unwrap();
    head.copy_from(&tail).unwrap();
    assert_eq!(img.to_vec::<u8>().unwrap(), vec![2, 3, 4, 5, 6, 7, 8, 9, 8, 9]);
}

#[test]
fn blur_into_the_input_leaves_the_input_untouched() {
    let img = checkerboard_u8(16, 16, 4);
    let before = img.to_vec::<u8>().unwrap();
    let mut expected = Image::default();
    gaussian_blur(&img, &mut expected, &[BoundaryCondition::SymmetricMirror]).unwrap();

    let mut out = img.clone();
    gaussian_blur(&img, &mut out, &[BoundaryCondition::SymmetricMirror]).unwrap();
    assert!(!out.aliases(&img));
    assert_eq!(img.to_vec::<u8>().unwrap(), before);
    assert_eq!(out.to_vec::<f32>().unwrap(), expected.to_vec::<f32>().unwrap());
}

#[test]
fn downsample_over_its_input() {
    let img = ramp_f32(&[6, 4]);
    let mut out = img.clone();
    downsample(&img, &mut out, 2).unwrap();
    assert_eq!(out.sizes(), &[3, 2]);
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![0.0, 2.0, 4.0, 12.0, 14.0, 16.0]);
    assert_eq!(img.get::<f32>(&[1, 0], 0).unwrap(), 1.0);
}

#[test]
fn downsample_of_a_strided_view() {
    let img = ramp_f32(&[7, 3]);
    let mut view = img.at(&[Range::all(), Range::all()]).unwrap();
    view.mirror(&[true, false]).unwrap();
    let mut out = Image::default();
    downsample(&view, &mut out, 3).unwrap();
    assert_eq!(out.sizes(), &[3, 1]);
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![6.0, 3.0, 0.0]);
}
