//! # Raster Mask Polygonization Library
//!
//! Turns a classified raster band (building, road or change-detection masks)
//! into cleaned, simplified and georeferenced polygon features.
//!
//! ## Core Features
//!
//! - **GeoTIFF Loading**: first band, affine geotransform, EPSG code and nodata
//! - **Region Extraction**: one polygon per 4-connected region, holes included
//! - **Pluggable Processing**: ordered steps implementing [`ShapeProcessor`]
//! - **Streaming GeoJSON Output**: features are projected and written one at a time
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polygonize::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .mask_value(255)
//!     .with_area_filter(25)
//!     .with_simplification(1.0, true)
//!     .build()?;
//!
//! let summary = pipeline.run("buildings.tif", "buildings.geojson")?;
//! println!("{} features in {}", summary.features_written, summary.crs);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Processing
//!
//! ```rust,no_run
//! use polygonize::{load_raster, Pipeline, ProcessingStats, PipelineSettings};
//!
//! let settings = PipelineSettings::from_file("settings.toml")?;
//! let pipeline = Pipeline::from_settings(&settings)?;
//!
//! let raster = load_raster("change.tif", settings.decimation)?;
//! let mut stats = ProcessingStats::default();
//! for shape in pipeline.process_raster(&raster, &mut stats) {
//!     println!("{:.1} m² with {} holes", shape.area(), shape.polygon.interiors().len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod raster;
pub mod traits;
pub mod types;

pub use algorithms::{ExtractionMode, Shapes, extract_shapes};
pub use error::{
    ConfigurationError, InputError, OutputError, PolygonizeError, ProcessingError, Result,
};
pub use io::{AttributeSchema, GeoJsonWriter, OutputFormat};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineSettings, ProcessingStep};
pub use raster::{Crs, GeoTransform, LoadedRaster, RasterBand, load_raster};
pub use traits::*;
pub use types::{PixelCounts, ProcessingStats, RunSummary, Shape};
