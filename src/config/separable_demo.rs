use crate::buffer::BoundaryCondition;
use crate::filters::PyramidOptions;
use crate::framework::ThreadingConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct SeparableDemoConfig {
    pub input: PathBuf,
    #[serde(default)]
    pub boundary: BoundaryCondition,
    #[serde(default)]
    pub threading: ThreadingConfig,
    #[serde(default)]
    pub pyramid: PyramidOptions,
    pub output: SeparableDemoOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct SeparableDemoOutputConfig {
    pub blurred_image: PathBuf,
    pub coarsest_image: PathBuf,
    pub summary_json: PathBuf,
}

pub fn load_config(path: &Path) -> Result<SeparableDemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg: SeparableDemoConfig = serde_json::from_str(
            r#"{
                "input": "in.png",
                "output": {
                    "blurred_image": "out/b.png",
                    "coarsest_image": "out/c.png",
                    "summary_json": "out/s.json"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.boundary, BoundaryCondition::SymmetricMirror);
        assert_eq!(cfg.threading, ThreadingConfig::default());
        assert_eq!(cfg.pyramid.levels, 3);
    }

    #[test]
    fn parses_full_config() {
        let cfg: SeparableDemoConfig = serde_json::from_str(
            r#"{
                "input": "in.png",
                "boundary": "periodic",
                "threading": { "threads": 2, "threshold": 1000 },
                "pyramid": { "levels": 5, "blur_levels": 2 },
                "output": {
                    "blurred_image": "b.png",
                    "coarsest_image": "c.png",
                    "summary_json": "s.json"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.boundary, BoundaryCondition::Periodic);
        assert_eq!(cfg.threading.threads, Some(2));
        assert_eq!(cfg.pyramid.blur_levels, Some(2));
        assert!(load_config(Path::new("/nonexistent/config.json")).is_err());
    }
}
