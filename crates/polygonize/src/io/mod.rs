pub mod geojson;
pub mod preview;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OutputError;

pub use self::geojson::{GeoJsonWriter, read_feature_collection};
pub use preview::save_mask_preview;

/// Vector formats the writer can produce, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    GeoJson,
}

impl OutputFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("geojson") | Some("json") => Ok(Self::GeoJson),
            other => Err(OutputError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Which attributes each written feature carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeSchema {
    /// No attributes, only the polygon
    #[default]
    GeometryOnly,
    /// A single integer `value` attribute holding the region's pixel value
    PixelValue,
}
