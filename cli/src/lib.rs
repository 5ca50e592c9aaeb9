use polygonize::{ConfigurationError, PipelineSettings};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Invalid settings for '{name}': {source}")]
    InvalidSettings {
        name: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("Raster name '{0}' is used more than once")]
    DuplicateName(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One raster to polygonize as part of a batch
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RasterJob {
    /// Output file stem, unique within the batch
    pub name: String,
    /// Path to the classified GeoTIFF
    pub path: String,
    pub description: Option<String>,
    /// Replaces the batch-wide settings for this raster
    pub settings: Option<PipelineSettings>,
}

/// Batch job file: many rasters, one output directory
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    pub output_dir: String,
    #[serde(default)]
    pub settings: PipelineSettings,
    pub rasters: Vec<RasterJob>,
}

impl BatchConfig {
    /// Skeleton job file with one entry per input, named after the file stem
    pub fn skeleton(output_dir: impl Into<String>, inputs: &[PathBuf]) -> Self {
        let rasters = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let name = input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_else(|| format!("raster_{:03}", i + 1));
                RasterJob {
                    name,
                    path: input.to_string_lossy().to_string(),
                    description: None,
                    settings: None,
                }
            })
            .collect();

        Self {
            output_dir: output_dir.into(),
            settings: PipelineSettings::default(),
            rasters,
        }
    }

    /// Settings that apply to `job`
    pub fn settings_for<'a>(&'a self, job: &'a RasterJob) -> &'a PipelineSettings {
        job.settings.as_ref().unwrap_or(&self.settings)
    }

    /// Where the vectors of `job` are written
    pub fn output_path(&self, job: &RasterJob) -> PathBuf {
        Path::new(&self.output_dir).join(format!("{}.geojson", job.name))
    }

    /// Check names and every settings block before any raster is read
    pub fn validate(&self) -> Result<(), BatchError> {
        self.settings
            .validate()
            .map_err(|source| BatchError::InvalidSettings {
                name: "settings".to_string(),
                source,
            })?;

        let mut names = HashSet::new();
        for job in &self.rasters {
            if !names.insert(job.name.as_str()) {
                return Err(BatchError::DuplicateName(job.name.clone()));
            }
            if let Some(settings) = &job.settings {
                settings
                    .validate()
                    .map_err(|source| BatchError::InvalidSettings {
                        name: job.name.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Load BatchConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, BatchError> {
        Ok(toml::from_str(content)?)
    }

    /// Load BatchConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, BatchError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(BatchError::UnsupportedFileFormat),
        }
    }

    /// Auto-detect file format and save configuration
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), BatchError> {
        let content = match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(BatchError::UnsupportedFileFormat),
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert BatchConfig to TOML string
    pub fn to_toml(&self) -> Result<String, BatchError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert BatchConfig to JSON string
    pub fn to_json(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Get the JSON schema for batch files
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BatchConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygonize::ProcessingStep;

    const BATCH: &str = r#"
output_dir = "vectors"

[settings]
mask_value = 1
min_area_pixels = 25
simplify_tolerance_pixels = 1.0

[[rasters]]
name = "buildings_2023"
path = "masks/buildings_2023.tif"

[[rasters]]
name = "roads"
path = "masks/roads.tif"
description = "Road network, kept unsimplified"

[rasters.settings]
mask_value = 255
"#;

    #[test]
    fn test_parse_batch_toml() {
        let config = BatchConfig::from_toml(BATCH).unwrap();
        assert_eq!(config.rasters.len(), 2);
        assert!(config.validate().is_ok());

        let buildings = &config.rasters[0];
        assert_eq!(config.settings_for(buildings).mask_value, 1);
        assert_eq!(
            config.settings_for(buildings).steps(),
            vec![
                ProcessingStep::FilterByArea { min_pixels: 25 },
                ProcessingStep::Simplify {
                    tolerance: 1.0,
                    preserve_topology: true
                },
            ]
        );
        assert_eq!(
            config.output_path(buildings),
            Path::new("vectors").join("buildings_2023.geojson")
        );

        let roads = &config.rasters[1];
        assert_eq!(config.settings_for(roads).mask_value, 255);
        assert!(config.settings_for(roads).steps().is_empty());
    }

    #[test]
    fn test_toml_and_json_round_trip() {
        let config = BatchConfig::from_toml(BATCH).unwrap();
        assert_eq!(BatchConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
        assert_eq!(BatchConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = BatchConfig::from_toml(BATCH).unwrap();
        config.rasters[1].name = "buildings_2023".to_string();
        assert!(matches!(config.validate(), Err(BatchError::DuplicateName(name)) if name == "buildings_2023"));
    }

    #[test]
    fn test_invalid_per_raster_settings_rejected() {
        let mut config = BatchConfig::from_toml(BATCH).unwrap();
        config.rasters[0].settings = Some(PipelineSettings {
            simplify_tolerance_pixels: -1.0,
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(BatchError::InvalidSettings { name, .. }) if name == "buildings_2023"
        ));
    }

    #[test]
    fn test_skeleton_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        let config = BatchConfig::skeleton(
            "out",
            &[PathBuf::from("masks/a.tif"), PathBuf::from("masks/b.tif")],
        );
        config.to_file(&path).unwrap();

        let loaded = BatchConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let names: Vec<&str> = loaded.rasters.iter().map(|job| job.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            BatchConfig::from_file("batch.yaml"),
            Err(BatchError::UnsupportedFileFormat)
        ));
    }
}
