use geo_types::{LineString, Polygon};
use tracing::debug;

use crate::{error::ProcessingError, traits::ShapeProcessor, types::Shape};

/// A closed ring needs at least three distinct corners plus the closing coordinate
const MIN_RING_COORDS: usize = 4;

/// Drop holes that collapsed and reject shapes whose exterior collapsed or went non-finite
fn check_polygon(step: &'static str, polygon: Polygon<f64>) -> Result<Polygon<f64>, ProcessingError> {
    let (exterior, interiors) = polygon.into_inner();

    if exterior.0.len() < MIN_RING_COORDS {
        return Err(ProcessingError::DegenerateRing {
            step,
            coords: exterior.0.len(),
        });
    }

    let finite = |ring: &LineString<f64>| ring.coords().all(|c| c.x.is_finite() && c.y.is_finite());
    if !finite(&exterior) || !interiors.iter().all(finite) {
        return Err(ProcessingError::NonFiniteCoordinate { step });
    }

    let hole_count = interiors.len();
    let interiors: Vec<LineString<f64>> = interiors
        .into_iter()
        .filter(|ring| ring.0.len() >= MIN_RING_COORDS)
        .collect();
    if interiors.len() < hole_count {
        debug!("{}: dropped {} collapsed holes", step, hole_count - interiors.len());
    }

    Ok(Polygon::new(exterior, interiors))
}

/// Drops shapes whose area, in pixels, is strictly below `min_pixels`
#[derive(Debug, Clone, Default)]
pub struct MinimumAreaFilter {
    pub min_pixels: u64,
}

impl ShapeProcessor for MinimumAreaFilter {
    fn name(&self) -> &'static str {
        "filter_by_area"
    }

    fn process(&self, shape: Shape) -> Result<Option<Shape>, ProcessingError> {
        if shape.area() < self.min_pixels as f64 {
            return Ok(None);
        }
        Ok(Some(shape))
    }
}

/// Ramer–Douglas–Peucker simplification using geo crate's implementation.
///
/// Rings are simplified independently, so the result may self-intersect or
/// let a hole cross its exterior.
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier {
    pub tolerance: f64,
}

impl ShapeProcessor for DouglasPeuckerSimplifier {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn process(&self, mut shape: Shape) -> Result<Option<Shape>, ProcessingError> {
        use geo::Simplify;

        if self.tolerance == 0.0 {
            return Ok(Some(shape));
        }
        let simplified = shape.polygon.simplify(&self.tolerance);
        shape.polygon = check_polygon(self.name(), simplified)?;
        Ok(Some(shape))
    }
}

/// Topology-preserving Visvalingam–Whyatt simplification using geo crate's implementation.
///
/// `tolerance` is a distance in pixels; vertices whose effective triangle
/// area is below `tolerance²` are removed unless that would make rings cross.
#[derive(Debug, Clone, Default)]
pub struct TopologyPreservingSimplifier {
    pub tolerance: f64,
}

impl ShapeProcessor for TopologyPreservingSimplifier {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn process(&self, mut shape: Shape) -> Result<Option<Shape>, ProcessingError> {
        use geo::SimplifyVwPreserve;

        if self.tolerance == 0.0 {
            return Ok(Some(shape));
        }
        let epsilon = self.tolerance * self.tolerance;
        let simplified = shape.polygon.simplify_vw_preserve(&epsilon);
        shape.polygon = check_polygon(self.name(), simplified)?;
        Ok(Some(shape))
    }
}

/// Geometry validation using basic checks: enough exterior corners, finite coordinates.
/// Collapsed holes are removed.
#[derive(Debug, Clone, Default)]
pub struct GeometryValidator;

impl ShapeProcessor for GeometryValidator {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn process(&self, mut shape: Shape) -> Result<Option<Shape>, ProcessingError> {
        shape.polygon = check_polygon(self.name(), shape.polygon)?;
        Ok(Some(shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Coord;

    fn shape(exterior: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> Shape {
        let polygon = Polygon::new(
            LineString::from(exterior),
            holes.into_iter().map(LineString::from).collect(),
        );
        Shape::new(polygon, 255, 0)
    }

    fn staircase() -> Shape {
        // A 6x6 square with a one-pixel notch on every side
        shape(
            vec![
                (0.0, 0.0),
                (3.0, 0.0),
                (3.0, 1.0),
                (4.0, 1.0),
                (4.0, 0.0),
                (6.0, 0.0),
                (6.0, 6.0),
                (0.0, 6.0),
            ],
            vec![],
        )
    }

    fn square(size: f64) -> Shape {
        shape(vec![(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)], vec![])
    }

    #[test]
    fn test_area_filter_threshold_is_strict() {
        let filter = MinimumAreaFilter { min_pixels: 4 };
        assert!(filter.process(square(2.0)).unwrap().is_some());

        let filter = MinimumAreaFilter { min_pixels: 5 };
        assert!(filter.process(square(2.0)).unwrap().is_none());
    }

    #[test]
    fn test_area_filter_zero_is_noop() {
        let filter = MinimumAreaFilter { min_pixels: 0 };
        let input = square(1.0);
        assert_eq!(filter.process(input.clone()).unwrap(), Some(input));
    }

    #[test]
    fn test_zero_tolerance_leaves_vertices_unchanged() {
        let input = staircase();
        let dp = DouglasPeuckerSimplifier { tolerance: 0.0 };
        let vw = TopologyPreservingSimplifier { tolerance: 0.0 };

        assert_eq!(dp.process(input.clone()).unwrap(), Some(input.clone()));
        assert_eq!(vw.process(input.clone()).unwrap(), Some(input));
    }

    #[test]
    fn test_douglas_peucker_removes_small_notch() {
        let input = staircase();
        let simplified = DouglasPeuckerSimplifier { tolerance: 1.5 }
            .process(input.clone())
            .unwrap()
            .unwrap();
        assert!(simplified.vertex_count() < input.vertex_count());
        assert_eq!(simplified.area(), 36.0);
    }

    #[test]
    fn test_topology_preserving_keeps_a_valid_ring() {
        let input = staircase();
        let simplified = TopologyPreservingSimplifier { tolerance: 1.5 }
            .process(input.clone())
            .unwrap()
            .unwrap();
        assert!(simplified.vertex_count() <= input.vertex_count());
        assert!(simplified.polygon.exterior().0.len() >= MIN_RING_COORDS);
    }

    #[test]
    fn test_collapsed_exterior_is_a_processing_error() {
        let collapsed = Shape::new(
            Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]), vec![]),
            255,
            0,
        );
        let err = GeometryValidator.process(collapsed).unwrap_err();
        assert_eq!(err, ProcessingError::DegenerateRing { step: "validate", coords: 3 });
    }

    #[test]
    fn test_validator_rejects_non_finite_coordinates() {
        let mut input = square(2.0);
        let mut exterior = input.polygon.exterior().clone();
        exterior.0[1] = Coord { x: f64::NAN, y: 0.0 };
        input.polygon = Polygon::new(exterior, vec![]);

        assert_eq!(
            GeometryValidator.process(input).unwrap_err(),
            ProcessingError::NonFiniteCoordinate { step: "validate" }
        );
    }

    #[test]
    fn test_validator_drops_collapsed_holes() {
        let input = shape(
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)],
            vec![vec![(1.0, 1.0), (2.0, 1.0)]],
        );
        let validated = GeometryValidator.process(input).unwrap().unwrap();
        assert!(!validated.has_holes());
    }
}
