use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr, VariantNames};

use crate::{
    algorithms::{
        DouglasPeuckerSimplifier, GeometryValidator, MinimumAreaFilter,
        TopologyPreservingSimplifier,
    },
    error::ConfigurationError,
    traits::ShapeProcessor,
};

fn default_true() -> bool {
    true
}

/// One entry of the caller-supplied processing pipeline.
#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingStep {
    /// Drop shapes smaller than `min_pixels` pixels
    FilterByArea { min_pixels: u64 },
    /// Reduce vertex count; tolerance is in pixels
    Simplify {
        #[schemars(range(min = 0.0))]
        tolerance: f64,
        #[serde(default = "default_true")]
        preserve_topology: bool,
    },
    /// Reject degenerate or non-finite shapes, drop collapsed holes
    Validate,
}

impl ProcessingStep {
    /// Check the step's parameters without touching any geometry
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Simplify { tolerance, .. } if !tolerance.is_finite() || *tolerance < 0.0 => {
                Err(ConfigurationError::InvalidTolerance(*tolerance))
            }
            _ => Ok(()),
        }
    }

    pub fn to_processor(&self) -> Box<dyn ShapeProcessor> {
        match *self {
            Self::FilterByArea { min_pixels } => Box::new(MinimumAreaFilter { min_pixels }),
            Self::Simplify {
                tolerance,
                preserve_topology: true,
            } => Box::new(TopologyPreservingSimplifier { tolerance }),
            Self::Simplify {
                tolerance,
                preserve_topology: false,
            } => Box::new(DouglasPeuckerSimplifier { tolerance }),
            Self::Validate => Box::new(GeometryValidator),
        }
    }

    /// Get a description of the step
    pub fn description(&self) -> &'static str {
        match self {
            Self::FilterByArea { .. } => "Drop shapes whose pixel area is below the threshold",
            Self::Simplify {
                preserve_topology: true,
                ..
            } => "Topology-preserving Visvalingam-Whyatt simplification",
            Self::Simplify {
                preserve_topology: false,
                ..
            } => "Douglas-Peucker simplification, rings simplified independently",
            Self::Validate => "Reject degenerate shapes and drop collapsed holes",
        }
    }
}

/// Everything one pipeline run needs to know besides its input and output paths.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Pixel value treated as foreground
    pub mask_value: i64,
    /// Area filter threshold in pixels; 0 disables filtering
    pub min_area_pixels: u64,
    /// Simplification tolerance in pixels; 0 disables simplification
    pub simplify_tolerance_pixels: f64,
    /// Simplification mode
    pub preserve_topology: bool,
    /// Keep every n-th row and column (preview); 1 reads the full raster
    #[schemars(range(min = 1))]
    pub decimation: u32,
    /// Emit every region including background and nodata, not only the foreground
    pub all_features: bool,
    /// Explicit ordered steps; replaces `min_area_pixels` and `simplify_tolerance_pixels` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<ProcessingStep>>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mask_value: 255,
            min_area_pixels: 0,
            simplify_tolerance_pixels: 0.0,
            preserve_topology: true,
            decimation: 1,
            all_features: false,
            steps: None,
        }
    }
}

impl PipelineSettings {
    /// The ordered steps these settings describe
    pub fn steps(&self) -> Vec<ProcessingStep> {
        if let Some(steps) = &self.steps {
            return steps.clone();
        }

        let mut steps = Vec::new();
        if self.min_area_pixels > 0 {
            steps.push(ProcessingStep::FilterByArea {
                min_pixels: self.min_area_pixels,
            });
        }
        if self.simplify_tolerance_pixels != 0.0 {
            steps.push(ProcessingStep::Simplify {
                tolerance: self.simplify_tolerance_pixels,
                preserve_topology: self.preserve_topology,
            });
        }
        steps
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.decimation == 0 {
            return Err(ConfigurationError::ZeroDecimation);
        }
        self.steps().iter().try_for_each(ProcessingStep::validate)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load settings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            other => Err(ConfigurationError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Get the JSON schema for the settings
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineSettings)
    }
}
