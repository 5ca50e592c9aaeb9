//! Affine pixel → world transform.

use geo::{AffineOps, AffineTransform};
use geo_types::{Coord, Polygon};
use serde::{Deserialize, Serialize};

/// Affine coefficients mapping pixel corners to the raster CRS:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// For a north-up raster `b` and `d` are 0 and `e` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn to_affine(&self) -> AffineTransform<f64> {
        AffineTransform::new(self.a, self.b, self.c, self.d, self.e, self.f)
    }

    /// Map a pixel-space coordinate into the raster CRS
    pub fn apply(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.a * coord.x + self.b * coord.y + self.c,
            y: self.d * coord.x + self.e * coord.y + self.f,
        }
    }

    /// Map every vertex of every ring of `polygon` into the raster CRS
    pub fn project(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        polygon.affine_transform(&self.to_affine())
    }

    /// Inverse transform (world → pixel), `None` when the linear part is singular
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }

        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Some(Self::new(
            a,
            b,
            -(a * self.c + b * self.f),
            d,
            e,
            -(d * self.c + e * self.f),
        ))
    }

    /// The same georeferencing for a raster resampled by keeping every `factor`-th pixel
    pub fn decimated(&self, factor: u32) -> Self {
        let k = f64::from(factor);
        Self::new(self.a * k, self.b * k, self.c, self.d * k, self.e * k, self.f)
    }

    /// Shift the origin by half a pixel, turning a pixel-is-point transform into pixel-is-area
    pub(crate) fn shifted_to_pixel_corner(&self) -> Self {
        let origin = self.apply(Coord { x: -0.5, y: -0.5 });
        Self::new(self.a, self.b, origin.x, self.d, self.e, origin.y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
