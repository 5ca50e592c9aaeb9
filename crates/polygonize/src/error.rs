use std::path::PathBuf;

use thiserror::Error;

/// Failures while opening or decoding the source raster. Always fatal.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to open raster {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode TIFF: {0}")]
    Decode(#[from] tiff::TiffError),

    #[error("Raster has no bands")]
    NoBands,

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Pixel buffer holds {actual} samples, expected a multiple of {width}x{height}")]
    SizeMismatch { width: u32, height: u32, actual: usize },

    #[error("Raster carries no affine geotransform")]
    MissingTransform,

    #[error("Raster carries no usable coordinate reference system")]
    MissingCrs,
}

/// Invalid pipeline parameters, detected before the raster is touched.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Simplification tolerance must be a finite value >= 0, got {0}")]
    InvalidTolerance(f64),

    #[error("Decimation factor must be >= 1")]
    ZeroDecimation,

    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported settings format: {0}. Please use .toml or .json files")]
    UnsupportedFormat(String),
}

/// A single shape could not be processed. The pipeline skips it and keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Step '{step}' produced a degenerate ring with {coords} coordinates")]
    DegenerateRing { step: &'static str, coords: usize },

    #[error("Step '{step}' produced a non-finite coordinate")]
    NonFiniteCoordinate { step: &'static str },
}

/// Failures while writing the vector dataset. Always fatal.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported output format: {0}. Supported formats: .geojson, .json")]
    UnsupportedFormat(String),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Failed to encode preview image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum PolygonizeError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type Result<T> = std::result::Result<T, PolygonizeError>;
