use std::path::Path;

use image::{GrayImage, ImageFormat};
use tracing::info;

use crate::error::OutputError;

/// Save a foreground mask as an 8-bit grayscale PNG, foreground white.
pub fn save_mask_preview(mask: &GrayImage, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    mask.save_with_format(path, ImageFormat::Png)?;
    info!("Saved {}x{} mask preview to {:?}", mask.width(), mask.height(), path);
    Ok(())
}
