use geo_types::{Coord, Polygon};
use serde::{Deserialize, Serialize};

/// A polygon traced from one connected region of equal-valued pixels.
///
/// Coordinates are in pixel space until the shape is projected: `x` is the
/// column, `y` is the row, and pixel corners sit on integer coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Exterior ring plus any holes
    pub polygon: Polygon<f64>,
    /// Raster value shared by every pixel of the region
    pub value: i64,
    /// Number of pixels in the source region
    pub pixel_count: u64,
}

impl Shape {
    pub fn new(polygon: Polygon<f64>, value: i64, pixel_count: u64) -> Self {
        Self {
            polygon,
            value,
            pixel_count,
        }
    }

    /// Area of the shape (exterior minus holes) in the units of its coordinates
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.polygon.unsigned_area()
    }

    /// Check if this shape contains holes
    pub fn has_holes(&self) -> bool {
        !self.polygon.interiors().is_empty()
    }

    /// Total number of coordinates over all rings, closing coordinates included
    pub fn vertex_count(&self) -> usize {
        self.polygon.exterior().0.len()
            + self
                .polygon
                .interiors()
                .iter()
                .map(|ring| ring.0.len())
                .sum::<usize>()
    }

    /// Iterate over every coordinate of every ring
    pub fn coords(&self) -> impl Iterator<Item = &Coord<f64>> {
        self.polygon
            .exterior()
            .coords()
            .chain(self.polygon.interiors().iter().flat_map(|ring| ring.coords()))
    }
}

/// Counts reported once a run has drained the shape stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Regions handed over by the extractor
    pub extracted: u64,
    /// Shapes dropped by a filter step
    pub filtered: u64,
    /// Shapes dropped because a step failed on them
    pub skipped: u64,
}

/// Outcome of one [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub width: u32,
    pub height: u32,
    pub crs: String,
    pub features_written: u64,
    pub stats: ProcessingStats,
}

/// Pixel tally for a band against a mask value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelCounts {
    pub total: u64,
    pub foreground: u64,
    pub nodata: u64,
}

impl PixelCounts {
    /// Share of valid (non-nodata) pixels that are foreground
    pub fn foreground_fraction(&self) -> f64 {
        let valid = self.total - self.nodata;
        if valid == 0 {
            0.0
        } else {
            self.foreground as f64 / valid as f64
        }
    }
}
