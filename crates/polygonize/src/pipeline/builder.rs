use tracing::debug;

use crate::{
    algorithms::ExtractionMode,
    error::ConfigurationError,
    pipeline::{Pipeline, settings::ProcessingStep},
    traits::ShapeProcessor,
};

enum Stage {
    Step(ProcessingStep),
    Custom(Box<dyn ShapeProcessor>),
}

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    mode: ExtractionMode,
    decimation: u32,
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder: mask value 255, full resolution, no steps
    pub fn new() -> Self {
        Self {
            mode: ExtractionMode::default(),
            decimation: 1,
            stages: Vec::new(),
        }
    }

    /// Polygonize the regions whose pixels equal `value`
    pub fn mask_value(mut self, value: i64) -> Self {
        self.mode = ExtractionMode::Mask { value };
        self
    }

    /// Polygonize every region of equal pixel value, background included
    pub fn all_features(mut self) -> Self {
        self.mode = ExtractionMode::AllFeatures;
        self
    }

    pub fn extraction_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Keep every `factor`-th row and column when loading
    pub fn decimation(mut self, factor: u32) -> Self {
        self.decimation = factor;
        self
    }

    /// Append a processing step
    pub fn add_step(mut self, step: ProcessingStep) -> Self {
        self.stages.push(Stage::Step(step));
        self
    }

    /// Append every step in order
    pub fn add_steps(self, steps: impl IntoIterator<Item = ProcessingStep>) -> Self {
        steps.into_iter().fold(self, Self::add_step)
    }

    /// Append a custom processor
    pub fn add_processor<P>(mut self, processor: P) -> Self
    where
        P: ShapeProcessor + 'static,
    {
        self.stages.push(Stage::Custom(Box::new(processor)));
        self
    }

    /// Drop shapes smaller than `min_pixels` pixels
    pub fn with_area_filter(self, min_pixels: u64) -> Self {
        self.add_step(ProcessingStep::FilterByArea { min_pixels })
    }

    /// Simplify with a tolerance given in pixels
    pub fn with_simplification(self, tolerance: f64, preserve_topology: bool) -> Self {
        self.add_step(ProcessingStep::Simplify {
            tolerance,
            preserve_topology,
        })
    }

    /// Add geometry validation as a processing step
    pub fn with_validation(self) -> Self {
        self.add_step(ProcessingStep::Validate)
    }

    /// Validate every parameter and assemble the pipeline
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        if self.decimation == 0 {
            return Err(ConfigurationError::ZeroDecimation);
        }

        let processors = self
            .stages
            .into_iter()
            .map(|stage| match stage {
                Stage::Step(step) => {
                    step.validate()?;
                    debug!("Step {}: {}", step, step.description());
                    Ok(step.to_processor())
                }
                Stage::Custom(processor) => Ok(processor),
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Pipeline::new(self.mode, self.decimation, processors))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ProcessingError, types::Shape};

    struct DropEverything;

    impl ShapeProcessor for DropEverything {
        fn name(&self) -> &'static str {
            "drop_everything"
        }

        fn process(&self, _shape: Shape) -> Result<Option<Shape>, ProcessingError> {
            Ok(None)
        }
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        assert_eq!(pipeline.mode(), ExtractionMode::Mask { value: 255 });
        assert_eq!(pipeline.decimation(), 1);
        assert!(pipeline.step_names().is_empty());
    }

    #[test]
    fn test_builder_keeps_step_order() {
        let pipeline = PipelineBuilder::new()
            .mask_value(1)
            .with_simplification(1.0, false)
            .with_area_filter(4)
            .add_processor(DropEverything)
            .with_validation()
            .build()
            .unwrap();

        assert_eq!(pipeline.mode(), ExtractionMode::Mask { value: 1 });
        assert_eq!(
            pipeline.step_names(),
            vec!["simplify", "filter_by_area", "drop_everything", "validate"]
        );
    }

    #[test]
    fn test_builder_rejects_negative_tolerance() {
        let result = PipelineBuilder::new().with_simplification(-0.5, true).build();
        assert!(matches!(result, Err(ConfigurationError::InvalidTolerance(_))));
    }

    #[test]
    fn test_builder_rejects_zero_decimation() {
        let result = PipelineBuilder::new().decimation(0).build();
        assert!(matches!(result, Err(ConfigurationError::ZeroDecimation)));
    }
}
