//! Raster loading: first band, affine transform and CRS of a GeoTIFF.

mod crs;
mod geotiff;
mod transform;

pub use crs::Crs;
pub use transform::GeoTransform;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tracing::{debug, info};

use crate::{
    error::{ConfigurationError, InputError, PolygonizeError},
    types::PixelCounts,
};

/// Foreground pixels in a [`GrayImage`] mask
pub const MASK_FOREGROUND: u8 = 255;

/// A single band of integer pixel values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    width: u32,
    height: u32,
    values: Vec<i64>,
    nodata: Option<i64>,
}

impl RasterBand {
    pub fn new(width: u32, height: u32, values: Vec<i64>) -> Result<Self, InputError> {
        if values.len() != width as usize * height as usize {
            return Err(InputError::SizeMismatch {
                width,
                height,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
            nodata: None,
        })
    }

    /// Build a band by evaluating `f(col, row)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> i64) -> Self {
        let values = (0..height)
            .flat_map(|row| (0..width).map(move |col| (col, row)))
            .map(|(col, row)| f(col, row))
            .collect();
        Self {
            width,
            height,
            values,
            nodata: None,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<i64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn nodata(&self) -> Option<i64> {
        self.nodata
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn get(&self, col: u32, row: u32) -> Option<i64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.values[row as usize * self.width as usize + col as usize])
    }

    /// Boolean mask as a grayscale image: 255 where the pixel equals `mask_value`, 0 elsewhere
    pub fn foreground_mask(&self, mask_value: i64) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |col, row| {
            let value = self.values[row as usize * self.width as usize + col as usize];
            Luma([if value == mask_value { MASK_FOREGROUND } else { 0 }])
        })
    }

    pub fn pixel_counts(&self, mask_value: i64) -> PixelCounts {
        let mut counts = PixelCounts {
            total: self.values.len() as u64,
            foreground: 0,
            nodata: 0,
        };
        for &value in &self.values {
            if Some(value) == self.nodata {
                counts.nodata += 1;
            } else if value == mask_value {
                counts.foreground += 1;
            }
        }
        counts
    }

    /// Keep every `factor`-th column and row, starting with the first
    pub fn decimate(&self, factor: u32) -> Self {
        if factor <= 1 {
            return self.clone();
        }
        let width = self.width.div_ceil(factor);
        let height = self.height.div_ceil(factor);
        let band = Self::from_fn(width, height, |col, row| {
            self.values[(row * factor) as usize * self.width as usize + (col * factor) as usize]
        });
        band.with_nodata(self.nodata)
    }
}

/// The band, georeferencing and provenance of one loaded raster.
#[derive(Debug, Clone)]
pub struct LoadedRaster {
    pub band: RasterBand,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub source: Option<PathBuf>,
}

impl LoadedRaster {
    pub fn new(band: RasterBand, transform: GeoTransform, crs: Crs) -> Self {
        Self {
            band,
            transform,
            crs,
            source: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.band.width()
    }

    pub fn height(&self) -> u32 {
        self.band.height()
    }

    pub fn foreground_mask(&self, mask_value: i64) -> GrayImage {
        self.band.foreground_mask(mask_value)
    }

    pub fn pixel_counts(&self, mask_value: i64) -> PixelCounts {
        self.band.pixel_counts(mask_value)
    }

    /// Resample for preview by keeping every `factor`-th pixel. The transform follows.
    pub fn decimate(&self, factor: u32) -> Result<Self, ConfigurationError> {
        if factor == 0 {
            return Err(ConfigurationError::ZeroDecimation);
        }
        Ok(Self {
            band: self.band.decimate(factor),
            transform: self.transform.decimated(factor),
            crs: self.crs,
            source: self.source.clone(),
        })
    }
}

/// Open a GeoTIFF, read its first band, affine transform and CRS, and close it again.
///
/// `decimation` keeps every n-th row and column (1 reads the full raster).
pub fn load_raster(path: impl AsRef<Path>, decimation: u32) -> Result<LoadedRaster, PolygonizeError> {
    if decimation == 0 {
        return Err(ConfigurationError::ZeroDecimation.into());
    }
    let path = path.as_ref();
    let raster = read_geotiff(path)?;
    info!(
        "Loaded {:?}: {}x{} pixels, {}",
        path,
        raster.width(),
        raster.height(),
        raster.crs
    );

    if decimation == 1 {
        return Ok(raster);
    }
    let decimated = raster.decimate(decimation)?;
    debug!(
        "Decimated by {} to {}x{} pixels",
        decimation,
        decimated.width(),
        decimated.height()
    );
    Ok(decimated)
}

fn read_geotiff(path: &Path) -> Result<LoadedRaster, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let metadata = geotiff::read_metadata(&mut decoder);
    let samples = first_band(decoder.read_image()?, width, height)?;

    let band = RasterBand::new(width, height, samples)?.with_nodata(metadata.nodata);
    let transform = metadata.transform.ok_or(InputError::MissingTransform)?;
    let crs = metadata.crs.ok_or(InputError::MissingCrs)?;

    Ok(LoadedRaster {
        band,
        transform,
        crs,
        source: Some(path.to_path_buf()),
    })
}

/// Widen the decoded samples to `i64`, keeping only the first sample of every pixel
fn first_band(result: DecodingResult, width: u32, height: u32) -> Result<Vec<i64>, InputError> {
    let samples: Vec<i64> = match result {
        DecodingResult::U8(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::U64(buf) => buf
            .into_iter()
            .map(|v| i64::try_from(v).unwrap_or(i64::MAX))
            .collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(i64::from).collect(),
        DecodingResult::I64(buf) => buf,
        _ => {
            return Err(InputError::UnsupportedSampleFormat(
                "floating point bands cannot hold class values".to_string(),
            ));
        }
    };

    let pixels = width as usize * height as usize;
    if samples.is_empty() || pixels == 0 {
        return Err(InputError::NoBands);
    }
    if samples.len() % pixels != 0 {
        return Err(InputError::SizeMismatch {
            width,
            height,
            actual: samples.len(),
        });
    }

    let bands = samples.len() / pixels;
    if bands == 1 {
        return Ok(samples);
    }
    debug!("Raster has {} bands, reading band 1", bands);
    Ok(samples.into_iter().step_by(bands).collect())
}
