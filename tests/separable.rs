mod common;

use common::synthetic_image::{checkerboard_u8, noise_f64, ramp_f32};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use strided_image::filters::{gaussian_blur, ConvolutionFilter, GAUSSIAN_5TAP};
use strided_image::framework::set_threading_threshold;
use strided_image::{
    one_dimensional_line_filter, separable, BoundaryCondition, DataType, Image, Result, SeparableLineFilter,
    SeparableLineFilterParams, SeparableOption, SeparableOptions,
};

/// Counts lines per dimension and copies input to output.
#[derive(Default)]
struct Recorder {
    lines: [AtomicUsize; 3],
    passes: Mutex<Vec<(usize, usize)>>,
    threads: AtomicUsize,
}

impl SeparableLineFilter for Recorder {
    fn filter(&self, params: &mut SeparableLineFilterParams<'_>) -> Result<()> {
        self.lines[params.dimension].fetch_add(1, Ordering::Relaxed);
        assert_eq!(params.position[params.dimension], 0, "lines start at the image edge");
        let mut passes = self.passes.lock().unwrap();
        if !passes.contains(&(params.pass, params.dimension)) {
            passes.push((params.pass, params.dimension));
        }
        drop(passes);
        for t in 0..params.out_buffer.tensor_length() {
            for i in 0..params.out_buffer.length() as isize {
                let v = params.in_buffer.get_tensor::<f64>(i, t);
                params.out_buffer.set_tensor(i, t, v);
            }
        }
        Ok(())
    }

    fn set_number_of_threads(&mut self, threads: usize) {
        self.threads.store(threads, Ordering::Relaxed);
    }
}

fn blur_with(input: &Image, options: SeparableOptions) -> Image {
    let mut filter = ConvolutionFilter::new(&GAUSSIAN_5TAP).unwrap();
    let mut out = Image::default();
    separable(
        input,
        &mut out,
        DataType::DFloat,
        DataType::DFloat,
        &[],
        &[2],
        &[BoundaryCondition::SymmetricMirror],
        &mut filter,
        options,
    )
    .unwrap();
    out
}

#[test]
fn multi_threaded_result_matches_single_threaded() {
    set_threading_threshold(0);
    let img = noise_f64(&[96, 64, 3], 1, 7);
    let single = blur_with(&img, SeparableOption::NoMultiThreading.into());
    let multi = blur_with(&img, SeparableOptions::new());
    assert_eq!(single.to_vec::<f64>().unwrap(), multi.to_vec::<f64>().unwrap());
}

#[test]
fn every_line_is_visited_once_per_pass() {
    let img = ramp_f32(&[16, 8, 2]);
    let mut rec = Recorder::default();
    let mut out = Image::default();
    separable(
        &img,
        &mut out,
        DataType::DFloat,
        DataType::SFloat,
        &[true, true, false],
        &[],
        &[],
        &mut rec,
        SeparableOptions::new(),
    )
    .unwrap();
    assert_eq!(rec.lines[0].load(Ordering::Relaxed), 8 * 2);
    assert_eq!(rec.lines[1].load(Ordering::Relaxed), 16 * 2);
    assert_eq!(rec.lines[2].load(Ordering::Relaxed), 0);
    let mut passes = rec.passes.lock().unwrap().clone();
    passes.sort();
    assert_eq!(passes, vec![(0, 0), (1, 1)]);
    assert!(rec.threads.load(Ordering::Relaxed) >= 1);
    assert_eq!(out.to_vec::<f32>().unwrap(), img.to_vec::<f32>().unwrap());
}

#[test]
fn blurring_a_mirrored_view_mirrors_the_result() {
    let img = checkerboard_u8(40, 30, 5);
    let mut flipped = img.clone();
    flipped.mirror(&[true, false]).unwrap();

    let mut direct = Image::default();
    gaussian_blur(&img, &mut direct, &[BoundaryCondition::SymmetricMirror]).unwrap();
    let mut via_view = Image::default();
    gaussian_blur(&flipped, &mut via_view, &[BoundaryCondition::SymmetricMirror]).unwrap();
    via_view.mirror(&[true, false]).unwrap();

    let a = direct.to_vec::<f32>().unwrap();
    let b = via_view.to_vec::<f32>().unwrap();
    assert_eq!(a.len(), 40 * 30);
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 1e-3, "{x} vs {y}");
    }
}

#[test]
fn only_flagged_dimensions_change() {
    let img = checkerboard_u8(12, 12, 3);
    let mut filter = ConvolutionFilter::new(&GAUSSIAN_5TAP).unwrap();
    let mut out = Image::default();
    separable(
        &img,
        &mut out,
        DataType::DFloat,
        DataType::UInt8,
        &[false, true],
        &[2],
        &[BoundaryCondition::ZeroOrderExtrapolate],
        &mut filter,
        SeparableOptions::new(),
    )
    .unwrap();
    let col: Vec<u8> = (0..12).map(|y| out.get::<u8>(&[0, y], 0).unwrap()).collect();
    let row: Vec<u8> = (0..12).map(|x| out.get::<u8>(&[x, 0], 0).unwrap()).collect();
    // Along x nothing was filtered: the first row keeps the 3-pixel cell pattern.
    assert_eq!(&row[0..3], &[row[0]; 3]);
    assert_eq!(&row[3..6], &[row[3]; 3]);
    assert_ne!(row[0], row[3]);
    // Along y values are blended.
    assert!(col.iter().any(|&v| v != 32 && v != 220));
}

#[test]
fn tensor_lines_reach_the_filter_interleaved() {
    let img = noise_f64(&[10, 6], 3, 1);
    let mut rec = Recorder::default();
    let mut out = Image::default();
    separable(
        &img,
        &mut out,
        DataType::DFloat,
        DataType::DFloat,
        &[],
        &[1],
        &[BoundaryCondition::Periodic],
        &mut rec,
        SeparableOptions::new(),
    )
    .unwrap();
    assert_eq!(out.tensor_elements(), 3);
    assert_eq!(out.to_vec::<f64>().unwrap(), img.to_vec::<f64>().unwrap());
}

/// Writes the running sum of the input line.
struct CumulativeSum;

impl SeparableLineFilter for CumulativeSum {
    fn filter(&self, params: &mut SeparableLineFilterParams<'_>) -> Result<()> {
        let mut acc = 0.0f64;
        for i in 0..params.out_buffer.length() as isize {
            acc += f64::from(params.in_buffer.get::<f32>(i));
            params.out_buffer.set(i, acc);
        }
        Ok(())
    }
}

#[test]
fn one_dimensional_filter_converts_between_buffer_types() {
    let img = Image::from_vec(&[3, 2], 1, vec![1u8, 2, 3, 4, 5, 6]).unwrap();
    let mut out = Image::default();
    one_dimensional_line_filter(
        &img,
        &mut out,
        DataType::SFloat,
        DataType::DFloat,
        DataType::SInt32,
        0,
        0,
        BoundaryCondition::default(),
        &mut CumulativeSum,
        SeparableOptions::new(),
    )
    .unwrap();
    assert_eq!(out.data_type(), DataType::SInt32);
    assert_eq!(out.to_vec::<i32>().unwrap(), vec![1, 3, 6, 4, 9, 15]);
}
