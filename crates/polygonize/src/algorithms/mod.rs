pub mod boundary;
pub mod extraction;
pub mod simplification;

pub use boundary::{PixelBounds, trace_region};
pub use extraction::*;
pub use simplification::*;
