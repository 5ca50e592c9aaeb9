use std::collections::HashMap;

use image::{GrayImage, ImageBuffer, Luma, Pixel, imageops};
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    algorithms::boundary::{PixelBounds, trace_region},
    raster::{MASK_FOREGROUND, RasterBand},
    types::Shape,
};

/// Region labels as produced by imageproc (0 = background).
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Which regions the extractor turns into polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Only regions whose pixels equal the mask value
    Mask { value: i64 },
    /// Every region of equal pixel value, background and nodata included
    AllFeatures,
}

impl Default for ExtractionMode {
    fn default() -> Self {
        Self::Mask { value: 255 }
    }
}

#[derive(Debug, Clone)]
struct Region {
    label: u32,
    value: i64,
    bounds: PixelBounds,
    pixel_count: u64,
}

/// Lazy, single-pass sequence of pixel-space shapes, one per 4-connected region.
///
/// Regions come out in row-major order of their first pixel. Labelling is done
/// up front; each polygon is traced only when the iterator reaches it.
#[derive(Debug)]
pub struct Shapes {
    labels: LabelImage,
    regions: std::vec::IntoIter<Region>,
}

impl Shapes {
    fn empty() -> Self {
        Self {
            labels: LabelImage::new(0, 0),
            regions: Vec::new().into_iter(),
        }
    }

    /// Number of regions not yet traced
    pub fn remaining(&self) -> usize {
        self.regions.len()
    }

    fn from_labels(labels: LabelImage, value_of: impl Fn(u32, u32) -> i64) -> Self {
        let mut regions: Vec<Region> = Vec::new();
        let mut index_of: HashMap<u32, usize> = HashMap::new();

        for (col, row, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            match index_of.get(&label) {
                Some(&index) => {
                    let region = &mut regions[index];
                    region.bounds.include(col, row);
                    region.pixel_count += 1;
                }
                None => {
                    index_of.insert(label, regions.len());
                    regions.push(Region {
                        label,
                        value: value_of(col, row),
                        bounds: PixelBounds::new(col, row),
                        pixel_count: 1,
                    });
                }
            }
        }

        debug!("Labelled {} regions", regions.len());
        Self {
            labels,
            regions: regions.into_iter(),
        }
    }

    fn trace(&self, region: &Region) -> Shape {
        let (width, height) = self.labels.dimensions();
        let labels = &self.labels;
        let label = region.label;

        let polygon = trace_region(region.bounds, |col, row| {
            col >= 0
                && row >= 0
                && col < i64::from(width)
                && row < i64::from(height)
                && labels.get_pixel(col as u32, row as u32)[0] == label
        });

        Shape::new(polygon, region.value, region.pixel_count)
    }
}

impl Iterator for Shapes {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        let region = self.regions.next()?;
        let shape = self.trace(&region);
        debug!(
            "Region {} (value {}): {} pixels, {} vertices",
            region.label,
            region.value,
            region.pixel_count,
            shape.vertex_count()
        );
        Some(shape)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.regions.size_hint()
    }
}

impl ExactSizeIterator for Shapes {}

/// 4-connected labels of `image`, `background` pixels left at 0.
///
/// The labeller needs at least one background pixel, so the image is labelled
/// inside a one-pixel background frame that is cropped off again.
fn label_regions<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, background: P) -> LabelImage
where
    P: Pixel + Eq,
{
    let (width, height) = image.dimensions();
    let mut framed = ImageBuffer::from_pixel(width + 2, height + 2, background);
    imageops::replace(&mut framed, image, 1, 1);

    let labels = connected_components(&framed, Connectivity::Four, background);
    imageops::crop_imm(&labels, 1, 1, width, height).to_image()
}

/// Polygons for the foreground regions of a mask (pixels equal to 255).
pub fn extract_mask_shapes(mask: &GrayImage, mask_value: i64) -> Shapes {
    let labels = label_regions(mask, Luma([0u8]));
    Shapes::from_labels(labels, |_, _| mask_value)
}

/// Polygons for every region of equal value in the band.
pub fn extract_all_shapes(band: &RasterBand) -> Shapes {
    // Dense class ids starting at 1, so no class collides with the labeller's background
    let mut class_of: HashMap<i64, u32> = HashMap::new();
    let classes: Vec<u32> = band
        .values()
        .iter()
        .map(|value| {
            let next = class_of.len() as u32 + 1;
            *class_of.entry(*value).or_insert(next)
        })
        .collect();

    let class_image = LabelImage::from_raw(band.width(), band.height(), classes)
        .unwrap_or_else(|| LabelImage::new(band.width(), band.height()));
    let labels = label_regions(&class_image, Luma([0u32]));

    Shapes::from_labels(labels, |col, row| band.get(col, row).unwrap_or_default())
}

/// Run the extractor for `mode` over `band`.
pub fn extract_shapes(band: &RasterBand, mode: ExtractionMode) -> Shapes {
    match mode {
        ExtractionMode::Mask { value } => {
            let mask = band.foreground_mask(value);
            if is_empty_mask(&mask) {
                debug!("No pixel equals mask value {}", value);
                return Shapes::empty();
            }
            extract_mask_shapes(&mask, value)
        }
        ExtractionMode::AllFeatures => extract_all_shapes(band),
    }
}

/// True when `mask` has no foreground pixel.
pub fn is_empty_mask(mask: &GrayImage) -> bool {
    !mask.pixels().any(|p| p[0] == MASK_FOREGROUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::LineString;

    fn band_from_rows(rows: &[&[i64]]) -> RasterBand {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        RasterBand::from_fn(width, height, |col, row| rows[row as usize][col as usize])
    }

    fn corners(ring: &LineString<f64>) -> Vec<(f64, f64)> {
        ring.coords().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn test_all_background_yields_nothing() {
        let band = RasterBand::from_fn(8, 8, |_, _| 0);
        let mask = band.foreground_mask(255);
        assert!(is_empty_mask(&mask));
        assert_eq!(extract_shapes(&band, ExtractionMode::default()).count(), 0);
    }

    #[test]
    fn test_single_block() {
        let band = band_from_rows(&[
            &[0, 0, 0, 0],
            &[0, 255, 255, 0],
            &[0, 255, 255, 0],
            &[0, 0, 0, 0],
        ]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::Mask { value: 255 }).collect();

        assert_eq!(shapes.len(), 1);
        let shape = &shapes[0];
        assert_eq!(shape.area(), 4.0);
        assert_eq!(shape.pixel_count, 4);
        assert_eq!(shape.value, 255);
        assert_eq!(
            corners(shape.polygon.exterior()),
            vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0), (1.0, 1.0)]
        );
    }

    #[test]
    fn test_two_blocks_in_row_major_order() {
        let band = band_from_rows(&[
            &[0, 0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 255, 0],
            &[255, 255, 255, 0, 255, 0],
            &[255, 255, 255, 0, 0, 0],
        ]);
        let mut shapes = extract_shapes(&band, ExtractionMode::Mask { value: 255 });
        assert_eq!(shapes.len(), 2);

        let first = shapes.next().unwrap();
        assert_eq!(first.area(), 2.0);
        assert_eq!(first.polygon.exterior().0[0].x, 4.0);

        let second = shapes.next().unwrap();
        assert_eq!(second.area(), 6.0);
        assert_eq!(shapes.remaining(), 0);
        assert!(shapes.next().is_none());
    }

    #[test]
    fn test_diagonal_pixels_are_separate_regions() {
        let band = band_from_rows(&[&[255, 0], &[0, 255]]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::Mask { value: 255 }).collect();
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|shape| shape.area() == 1.0));
    }

    #[test]
    fn test_only_mask_value_is_foreground() {
        let band = band_from_rows(&[&[1, 1, 2], &[1, 7, 2]]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::Mask { value: 7 }).collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].value, 7);
        assert_eq!(shapes[0].area(), 1.0);
    }

    #[test]
    fn test_hole_is_kept() {
        let band = band_from_rows(&[
            &[255, 255, 255],
            &[255, 0, 255],
            &[255, 255, 255],
        ]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::Mask { value: 255 }).collect();
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].has_holes());
        assert_eq!(shapes[0].area(), 8.0);
    }

    #[test]
    fn test_all_features_covers_every_pixel() {
        let band = band_from_rows(&[
            &[0, 0, 0, 0],
            &[0, 255, 255, 0],
            &[0, 255, 255, 0],
            &[0, 0, 3, 3],
        ]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::AllFeatures).collect();

        assert_eq!(shapes.len(), 3);
        let total: f64 = shapes.iter().map(Shape::area).sum();
        assert_eq!(total, 16.0);

        let values: Vec<i64> = shapes.iter().map(|shape| shape.value).collect();
        assert_eq!(values, vec![0, 255, 3]);
        assert_eq!(shapes[0].area(), 10.0);
    }

    #[test]
    fn test_single_foreground_pixel() {
        let band = band_from_rows(&[&[255]]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::default()).collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].area(), 1.0);
        assert_eq!(
            corners(shapes[0].polygon.exterior()),
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn test_mask_touching_every_edge() {
        let band = band_from_rows(&[&[255, 255, 255], &[255, 255, 255]]);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::default()).collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].area(), 6.0);
        assert_eq!(shapes[0].pixel_count, 6);
    }

    #[test]
    fn test_all_features_without_repeated_neighbours() {
        let cases = [
            (band_from_rows(&[&[1, 0]]), 2),
            (band_from_rows(&[&[1, 2, 1]]), 3),
            (band_from_rows(&[&[1, 2], &[0, 1]]), 4),
            (band_from_rows(&[&[1, 2, 1], &[2, 1, 0]]), 6),
        ];

        for (band, regions) in cases {
            let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::AllFeatures).collect();
            assert_eq!(shapes.len(), regions);

            let total: f64 = shapes.iter().map(Shape::area).sum();
            assert_eq!(total, f64::from(band.width() * band.height()));
        }
    }

    #[test]
    fn test_all_features_single_value_band() {
        let band = RasterBand::from_fn(3, 2, |_, _| 4);
        let shapes: Vec<Shape> = extract_shapes(&band, ExtractionMode::AllFeatures).collect();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].value, 4);
        assert_eq!(shapes[0].area(), 6.0);
    }
}
