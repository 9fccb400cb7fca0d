//! Demonstration binary for the separable framework.
//!
//! 1. Load a grayscale image and apply the threading configuration.
//! 2. Blur it with the 5-tap Gaussian through `separable`, one timed pass
//!    per dimension, using the configured boundary condition.
//! 3. Build a pyramid on the blurred image.
//! 4. Save the blurred image and the coarsest level, and write a JSON summary
//!    with per-stage timings.

use std::env;
use std::path::Path;
use std::time::Instant;
use strided_image::config::separable_demo::{self as demo_cfg, SeparableDemoConfig};
use strided_image::diagnostics::{
    mean_intensity, ImageDescriptor, PassGeometry, PyramidLevelReport, RunSummary, TimingBreakdown,
};
use strided_image::filters::{separable_convolution, ConvolutionFilter, Pyramid, GAUSSIAN_5TAP};
use strided_image::framework::{number_of_threads, threading_threshold};
use strided_image::image::io::{load_grayscale_image, save_grayscale, write_json_file};
use strided_image::Image;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = load_config_from_args()?;
    config.threading.apply();
    let total_start = Instant::now();
    let mut timings = TimingBreakdown::default();

    let gray = timings.time("load", || load_grayscale_image(&config.input))?;

    let blurred = blur_per_dimension(&gray, &config, &mut timings)?;

    let options = config.pyramid.with_boundary(config.boundary);
    let pyramid = timings.time("pyramid", || {
        Pyramid::build(&blurred, options).map_err(|e| format!("Pyramid construction failed: {e}"))
    })?;

    timings.time("save", || -> Result<(), String> {
        save_grayscale(&blurred, &config.output.blurred_image)?;
        save_grayscale(pyramid.coarsest(), &config.output.coarsest_image)
    })?;

    timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let summary = build_summary(&config, &gray, &blurred, &pyramid, timings)?;
    write_json_file(&config.output.summary_json, &summary)?;

    println!(
        "Blurred {:?} with '{}' on {} thread(s) (threshold {}), {} pyramid levels, coarsest {:?}",
        gray.sizes(),
        config.boundary,
        summary.threads,
        summary.threading_threshold,
        pyramid.levels.len(),
        pyramid.coarsest().sizes()
    );
    for stage in &summary.timings.stages {
        match &stage.pass {
            Some(pass) => println!(
                "  {:<14} {:>8.2} ms  ({} lines of {})",
                stage.label, stage.elapsed_ms, pass.lines, pass.line_length
            ),
            None => println!("  {:<14} {:>8.2} ms", stage.label, stage.elapsed_ms),
        }
    }
    println!("Total: {:.2} ms", summary.timings.total_ms);
    println!("Summary written to {}", config.output.summary_json.display());
    Ok(())
}

/// Gaussian blur as one `separable` call per dimension, so each pass is
/// timed on its own.
fn blur_per_dimension(
    gray: &Image,
    config: &SeparableDemoConfig,
    timings: &mut TimingBreakdown,
) -> Result<Image, String> {
    let filter = ConvolutionFilter::new(&GAUSSIAN_5TAP).map_err(|e| e.to_string())?;
    let nd = gray.dimensionality();
    let mut current = gray.clone();
    for dim in 0..nd {
        let pass = PassGeometry::along(&current, dim).map_err(|e| e.to_string())?;
        let mut process = vec![false; nd];
        process[dim] = true;
        let mut out = Image::default();
        timings.time_pass(format!("blur dim {dim}"), pass, || {
            separable_convolution(&current, &mut out, &filter, &[config.boundary], &process)
                .map_err(|e| format!("Blur failed along dimension {dim}: {e}"))
        })?;
        current = out;
    }
    Ok(current)
}

fn build_summary(
    config: &SeparableDemoConfig,
    input: &Image,
    blurred: &Image,
    pyramid: &Pyramid,
    timings: TimingBreakdown,
) -> Result<RunSummary, String> {
    let levels = pyramid
        .levels
        .iter()
        .enumerate()
        .map(|(level, image)| {
            Ok(PyramidLevelReport {
                level,
                sizes: image.sizes().to_vec(),
                scale: pyramid.scale_for_level(level),
                mean_intensity: mean_intensity(image).map_err(|e| e.to_string())?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(RunSummary {
        input: ImageDescriptor::of(input),
        output: ImageDescriptor::of(blurred),
        boundary: config.boundary.to_string(),
        threads: number_of_threads(),
        threading_threshold: threading_threshold(),
        pyramid: levels,
        timings,
    })
}

fn load_config_from_args() -> Result<SeparableDemoConfig, String> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| "Usage: separable_demo <config.json>".to_string())?;
    demo_cfg::load_config(Path::new(&path))
}
