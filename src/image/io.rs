//! I/O helpers bridging [`Image`] and the `image` crate, plus JSON output.
//!
//! - `load_grayscale_image`: read a PNG/JPEG/etc. into a forged 2-D `UInt8` image.
//! - `save_grayscale`: write any 2-D scalar image to a grayscale PNG, saturating to 8 bits.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::Image;
use crate::datatype::DataType;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<Image, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    Image::from_vec(&[width, height], 1, img.into_raw())
        .map_err(|e| format!("Failed to wrap {}: {e}", path.display()))
}

/// Save a 2-D scalar image to a grayscale PNG. Samples are cast to `u8`
/// with saturation, so float images are expected in [0, 255].
pub fn save_grayscale(image: &Image, path: &Path) -> Result<(), String> {
    if image.dimensionality() != 2 || !image.is_scalar() {
        return Err(format!(
            "Cannot save {}: expected a 2-D scalar image, got sizes {:?} with {} tensor elements",
            path.display(),
            image.sizes(),
            image.tensor_elements()
        ));
    }
    ensure_parent_dir(path)?;
    let pixels = image
        .convert(DataType::UInt8)
        .and_then(|gray| gray.to_vec::<u8>())
        .map_err(|e| format!("Failed to convert image for {}: {e}", path.display()))?;
    let out = GrayImage::from_raw(image.size(0) as u32, image.size(1) as u32, pixels)
        .ok_or_else(|| "Failed to create image buffer".to_string())?;
    DynamicImage::ImageLuma8(out)
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
