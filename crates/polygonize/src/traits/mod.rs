use crate::{
    error::{OutputError, ProcessingError},
    types::Shape,
};

/// One step of the geometry processor.
///
/// A step sees each shape on its own, in pixel space. Returning `Ok(None)`
/// drops the shape; returning an error skips it without aborting the run.
pub trait ShapeProcessor: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Filter or transform a single shape
    fn process(&self, shape: Shape) -> Result<Option<Shape>, ProcessingError>;
}

/// Destination for projected shapes.
pub trait FeatureSink {
    /// Append one shape to the output
    fn write_shape(&mut self, shape: &Shape) -> Result<(), OutputError>;

    /// Flush and close the output, returning the number of shapes written
    fn finish(&mut self) -> Result<u64, OutputError>;
}

impl FeatureSink for Vec<Shape> {
    fn write_shape(&mut self, shape: &Shape) -> Result<(), OutputError> {
        self.push(shape.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, OutputError> {
        Ok(self.len() as u64)
    }
}
