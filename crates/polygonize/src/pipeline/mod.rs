pub mod builder;
pub mod settings;

use std::path::Path;

use tracing::{info, warn};

use crate::{
    algorithms::{ExtractionMode, extract_shapes},
    error::{ConfigurationError, OutputError, ProcessingError, Result},
    io::{AttributeSchema, GeoJsonWriter, OutputFormat},
    raster::{LoadedRaster, load_raster},
    traits::{FeatureSink, ShapeProcessor},
    types::{ProcessingStats, RunSummary, Shape},
};

pub use builder::PipelineBuilder;
pub use settings::{PipelineSettings, ProcessingStep};

/// Load → Extract → Process → Project/Write, one raster per run.
///
/// A pipeline holds no per-run state and can be reused for any number of rasters.
pub struct Pipeline {
    mode: ExtractionMode,
    decimation: u32,
    processors: Vec<Box<dyn ShapeProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn new(mode: ExtractionMode, decimation: u32, processors: Vec<Box<dyn ShapeProcessor>>) -> Self {
        Self {
            mode,
            decimation,
            processors,
        }
    }

    /// Build a pipeline from an explicit settings object
    pub fn from_settings(settings: &PipelineSettings) -> std::result::Result<Self, ConfigurationError> {
        let builder = Self::builder().decimation(settings.decimation);
        let builder = if settings.all_features {
            builder.all_features()
        } else {
            builder.mask_value(settings.mask_value)
        };
        builder.add_steps(settings.steps()).build()
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    /// Names of the processing steps, in the order they run
    pub fn step_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Attribute schema of the features this pipeline writes
    pub fn attribute_schema(&self) -> AttributeSchema {
        match self.mode {
            ExtractionMode::Mask { .. } => AttributeSchema::GeometryOnly,
            ExtractionMode::AllFeatures => AttributeSchema::PixelValue,
        }
    }

    /// Run every step on one shape. `Ok(None)` means a step dropped it.
    pub fn process_shape(&self, shape: Shape) -> std::result::Result<Option<Shape>, ProcessingError> {
        self.processors
            .iter()
            .try_fold(Some(shape), |shape, processor| match shape {
                Some(shape) => processor.process(shape),
                None => Ok(None),
            })
    }

    /// Apply the steps to a stream of shapes, tallying drops and skips into `stats`
    pub fn process<'a, I>(&'a self, shapes: I, stats: &'a mut ProcessingStats) -> impl Iterator<Item = Shape> + 'a
    where
        I: IntoIterator<Item = Shape>,
        I::IntoIter: 'a,
    {
        shapes.into_iter().filter_map(move |shape| {
            stats.extracted += 1;
            match self.process_shape(shape) {
                Ok(Some(shape)) => Some(shape),
                Ok(None) => {
                    stats.filtered += 1;
                    None
                }
                Err(e) => {
                    warn!("Skipping shape {}: {}", stats.extracted, e);
                    stats.skipped += 1;
                    None
                }
            }
        })
    }

    /// Lazily extract, process and project the shapes of a loaded raster
    pub fn process_raster<'a>(
        &'a self,
        raster: &'a LoadedRaster,
        stats: &'a mut ProcessingStats,
    ) -> impl Iterator<Item = Shape> + 'a {
        let shapes = extract_shapes(&raster.band, self.mode);
        self.process(shapes, stats).map(move |mut shape| {
            shape.polygon = raster.transform.project(&shape.polygon);
            shape
        })
    }

    /// Drain the shapes of `raster` into `sink`
    pub fn write_raster(
        &self,
        raster: &LoadedRaster,
        sink: &mut dyn FeatureSink,
    ) -> std::result::Result<(u64, ProcessingStats), OutputError> {
        let mut stats = ProcessingStats::default();
        for shape in self.process_raster(raster, &mut stats) {
            sink.write_shape(&shape)?;
        }
        let written = sink.finish()?;
        Ok((written, stats))
    }

    /// Polygonize the GeoTIFF at `input` into a GeoJSON dataset at `output`
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<RunSummary> {
        let (input, output) = (input.as_ref(), output.as_ref());
        OutputFormat::from_path(output)?;

        let raster = load_raster(input, self.decimation)?;
        info!(
            "Polygonizing {:?} ({}x{}, {}) with {}",
            input,
            raster.width(),
            raster.height(),
            raster.crs,
            self.info()
        );

        let mut writer = GeoJsonWriter::create(output, &raster.crs, self.attribute_schema())?;
        let (features_written, stats) = self.write_raster(&raster, &mut writer)?;

        info!(
            "Wrote {} features to {:?} ({} regions, {} filtered, {} skipped)",
            features_written, output, stats.extracted, stats.filtered, stats.skipped
        );

        Ok(RunSummary {
            width: raster.width(),
            height: raster.height(),
            crs: raster.crs.to_string(),
            features_written,
            stats,
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let mode = match self.mode {
            ExtractionMode::Mask { value } => format!("mask value {}", value),
            ExtractionMode::AllFeatures => "all features".to_string(),
        };
        format!(
            "Pipeline: {}, decimation {}, steps [{}]",
            mode,
            self.decimation,
            self.step_names().join(", ")
        )
    }
}
