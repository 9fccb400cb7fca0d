//! Serializable timing and run reports emitted by the demo binary.

use crate::datatype::DataType;
use crate::image::Image;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Geometry of one separable pass: the filtered dimension, how many lines
/// run along it and how long each line is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassGeometry {
    pub dimension: usize,
    pub lines: usize,
    pub line_length: usize,
}

impl PassGeometry {
    /// Pass along `dimension` of `image`.
    pub fn along(image: &Image, dimension: usize) -> crate::Result<Self> {
        if dimension >= image.dimensionality() {
            return Err(crate::Error::IndexOutOfRange {
                index: dimension as isize,
                size: image.dimensionality(),
            });
        }
        let line_length = image.size(dimension);
        Ok(Self {
            dimension,
            lines: image.number_of_pixels() / line_length,
            line_length,
        })
    }
}

/// Wall time of one stage; separable passes carry their geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<PassGeometry>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    fn record<R>(&mut self, label: String, pass: Option<PassGeometry>, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.stages.push(StageTiming {
            label,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            pass,
        });
        result
    }

    /// Runs `f`, records its duration under `label` and returns its result.
    pub fn time<R>(&mut self, label: impl Into<String>, f: impl FnOnce() -> R) -> R {
        self.record(label.into(), None, f)
    }

    /// Like [`time`](Self::time) for a single separable pass.
    pub fn time_pass<R>(&mut self, label: impl Into<String>, pass: PassGeometry, f: impl FnOnce() -> R) -> R {
        self.record(label.into(), Some(pass), f)
    }

    /// Stages that were separable passes.
    pub fn passes(&self) -> impl Iterator<Item = &StageTiming> + '_ {
        self.stages.iter().filter(|s| s.pass.is_some())
    }

    /// Sum of the recorded stage durations.
    pub fn stages_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

/// Shape and type of one image in a report.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub sizes: Vec<usize>,
    pub tensor_elements: usize,
    pub data_type: String,
}

impl ImageDescriptor {
    pub fn of(image: &Image) -> Self {
        Self {
            sizes: image.sizes().to_vec(),
            tensor_elements: image.tensor_elements(),
            data_type: image.data_type().name().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidLevelReport {
    pub level: usize,
    pub sizes: Vec<usize>,
    pub scale: f32,
    pub mean_intensity: f64,
}

/// Summary written by `separable_demo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub input: ImageDescriptor,
    pub output: ImageDescriptor,
    pub boundary: String,
    pub threads: usize,
    pub threading_threshold: usize,
    pub pyramid: Vec<PyramidLevelReport>,
    pub timings: TimingBreakdown,
}

/// Mean over all samples, as `f64`. Complex samples contribute their modulus.
pub fn mean_intensity(image: &Image) -> crate::Result<f64> {
    let n = image.number_of_samples();
    if n == 0 {
        return Ok(0.0);
    }
    let values = if image.data_type() == DataType::DFloat {
        image.to_vec::<f64>()?
    } else {
        image.convert(DataType::DFloat)?.to_vec::<f64>()?
    };
    Ok(values.iter().sum::<f64>() / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_carry_their_geometry() {
        let img = Image::new(&[8, 3, 2], 1, DataType::UInt8).unwrap();
        let mut t = TimingBreakdown::default();
        let pass = PassGeometry::along(&img, 1).unwrap();
        assert_eq!(pass, PassGeometry { dimension: 1, lines: 16, line_length: 3 });
        assert_eq!(t.time_pass("blur y", pass, || 7), 7);
        t.time("save", || ());
        assert_eq!(t.stages.len(), 2);
        assert_eq!(t.passes().count(), 1);
        assert!(PassGeometry::along(&img, 3).is_err());

        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["stages"][0]["pass"]["lineLength"], 3);
        assert!(json["stages"][1].get("pass").is_none());
        assert!(json["totalMs"].is_number());
        assert!(t.stages_ms() >= 0.0);
    }

    #[test]
    fn mean_of_ramp() {
        let img = Image::from_vec(&[4], 1, vec![0u8, 2, 4, 6]).unwrap();
        assert_eq!(mean_intensity(&img).unwrap(), 3.0);
        let d = ImageDescriptor::of(&img);
        assert_eq!(d.data_type, "uint8");
    }
}
